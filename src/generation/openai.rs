use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{LlmClient, ToolDefinition};
use crate::config::GenerationConfig;
use crate::{BarrierFreeError, Result};

/// Transient failures of a generation call are retried once by the transport
const TRANSPORT_RETRIES: u32 = 1;

/// OpenAI-compatible chat completions client using forced function calling
pub struct OpenAiClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
    tools: [ToolSpec<'a>; 1],
    tool_choice: ToolChoice<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolChoiceFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ToolChoiceFunction<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

/// `arguments` is a JSON document encoded as a string
#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

fn chat_request<'a>(
    model: &'a str,
    temperature: f32,
    system: &'a str,
    user: &'a str,
    tool: &'a ToolDefinition,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        temperature,
        messages: [
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ],
        tools: [ToolSpec {
            kind: "function",
            function: FunctionSpec {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.parameters,
            },
        }],
        tool_choice: ToolChoice {
            kind: "function",
            function: ToolChoiceFunction { name: &tool.name },
        },
    }
}

/// Arguments of the first tool call, if the model made one
fn first_tool_arguments(response: ChatResponse, expected_tool: &str) -> Option<String> {
    let call = response
        .choices
        .into_iter()
        .next()?
        .message
        .tool_calls
        .into_iter()
        .next()?;
    if call.function.name != expected_tool {
        warn!(
            "Model called '{}' instead of '{}'",
            call.function.name, expected_tool
        );
    }
    Some(call.function.arguments)
}

impl OpenAiClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BarrierFreeError::config("Generation API key is missing"))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("BarrierFree/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BarrierFreeError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(TRANSPORT_RETRIES);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    #[instrument(skip(self, system, user, tool), fields(model = %self.model, tool = %tool.name))]
    async fn call_tool(
        &self,
        system: &str,
        user: &str,
        tool: &ToolDefinition,
    ) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.base_url);
        let start_time = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_request(
                &self.model,
                self.temperature,
                system,
                user,
                tool,
            ))
            .send()
            .await
            .map_err(|e| BarrierFreeError::generation(format!("Generation request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Generation API returned {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => BarrierFreeError::generation(
                    "Generation API rejected the request. Please check the OpenAI API key.",
                ),
                429 => BarrierFreeError::generation("Generation API rate limit exceeded"),
                _ => BarrierFreeError::generation(format!(
                    "Generation API error {status}: {error_text}"
                )),
            });
        }

        let body = response.text().await.map_err(|e| {
            BarrierFreeError::generation(format!("Failed to read generation response: {e}"))
        })?;
        debug!(
            "Generation raw response: {}",
            body.chars().take(1000).collect::<String>()
        );

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            BarrierFreeError::generation(format!("Failed to parse generation response: {e}"))
        })?;

        let arguments = first_tool_arguments(parsed, &tool.name);
        info!(
            "Generation finished in {:.3}s (tool call: {})",
            start_time.elapsed().as_secs_f64(),
            arguments.is_some()
        );
        Ok(arguments)
    }
}
