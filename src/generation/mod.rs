//! Itinerary generation through a function-calling LLM
//!
//! The provider is asked to call a single tool whose arguments are the whole
//! itinerary. Anything other than a well-formed plan is a generation error;
//! there are no retries at this layer.

pub mod openai;
pub mod prompt;
pub mod requirements;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{ItineraryPlan, ReplacementRequest, UserTravelProfile};
use crate::{BarrierFreeError, Result};

pub use openai::OpenAiClient;

/// Function the model is forced to call
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// The itinerary tool
    #[must_use]
    pub fn itinerary() -> Self {
        Self {
            name: prompt::TOOL_NAME.to_string(),
            description: prompt::TOOL_DESCRIPTION.to_string(),
            parameters: prompt::itinerary_schema(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Raw JSON arguments of the forced tool call, `Ok(None)` when the model answered without one
    async fn call_tool(
        &self,
        system: &str,
        user: &str,
        tool: &ToolDefinition,
    ) -> Result<Option<String>>;
}

/// What to ask the planner for
#[derive(Debug, Clone, Copy)]
pub enum GenerationMode<'a> {
    Initial,
    Refine {
        replacements: &'a [ReplacementRequest],
        current: &'a ItineraryPlan,
    },
}

impl GenerationMode<'_> {
    fn label(&self) -> &'static str {
        match self {
            GenerationMode::Initial => "initial",
            GenerationMode::Refine { .. } => "refine",
        }
    }
}

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(
        &self,
        profile: &UserTravelProfile,
        mode: GenerationMode<'_>,
    ) -> Result<ItineraryPlan>;
}

/// Produces and repairs itineraries with an [`LlmClient`]
pub struct ItineraryGenerator {
    client: Arc<dyn LlmClient>,
    tool: ToolDefinition,
}

impl ItineraryGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            tool: ToolDefinition::itinerary(),
        }
    }

    fn instruction(profile: &UserTravelProfile, mode: GenerationMode<'_>) -> Result<String> {
        match mode {
            GenerationMode::Initial => Ok(prompt::initial_instruction(profile)),
            GenerationMode::Refine {
                replacements,
                current,
            } => prompt::refine_instruction(profile, replacements, current).map_err(|e| {
                BarrierFreeError::generation(format!("Failed to encode the current plan: {e}"))
            }),
        }
    }
}

/// Decode tool arguments into a plan and check it against the trip
pub fn parse_plan(arguments: &str, profile: &UserTravelProfile) -> Result<ItineraryPlan> {
    let plan: ItineraryPlan = serde_json::from_str(arguments).map_err(|e| {
        BarrierFreeError::generation(format!("Generated itinerary is malformed: {e}"))
    })?;
    plan.check_shape(profile).map_err(|reason| {
        BarrierFreeError::generation(format!("Generated itinerary is invalid: {reason}"))
    })?;
    Ok(plan)
}

#[async_trait]
impl PlanGenerator for ItineraryGenerator {
    #[instrument(skip_all, fields(mode = mode.label(), city = %profile.city))]
    async fn generate(
        &self,
        profile: &UserTravelProfile,
        mode: GenerationMode<'_>,
    ) -> Result<ItineraryPlan> {
        let user = Self::instruction(profile, mode)?;

        let Some(arguments) = self
            .client
            .call_tool(prompt::SYSTEM_PROMPT, &user, &self.tool)
            .await?
        else {
            warn!("Planner answered without calling the itinerary tool");
            return Err(BarrierFreeError::generation(
                "The planner did not return a structured itinerary",
            ));
        };

        let plan = parse_plan(&arguments, profile)?;
        info!(
            "Generated {} itinerary with {} days and {} places",
            mode.label(),
            plan.itinerary.len(),
            plan.place_count()
        );
        Ok(plan)
    }
}
