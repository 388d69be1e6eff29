//! End-to-end tests for the planning pipeline and its HTTP surface

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tower::ServiceExt;

use barrierfree::api::{AppState, ErrorEnvelope};
use barrierfree::config::{ServerConfig, ValidationConfig};
use barrierfree::generation::ToolDefinition;
use barrierfree::models::{AccessibilityFlags, DisabilityType};
use barrierfree::{
    BarrierFreeError, GeodataProvider, ItineraryGenerator, LlmClient, ManualClock, OutcomeStatus,
    PlaceRecord, PlaceResolver, Result, SearchBias, TtlCache, UserTravelProfile,
    ValidationOrchestrator, web,
};

/// Returns queued tool payloads in order, repeating the last one
struct QueuedLlm {
    payloads: Mutex<Vec<Value>>,
    calls: AtomicUsize,
}

impl QueuedLlm {
    fn new(payloads: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            payloads: Mutex::new(payloads),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmClient for QueuedLlm {
    async fn call_tool(
        &self,
        _system: &str,
        _user: &str,
        _tool: &ToolDefinition,
    ) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut payloads = self.payloads.lock().unwrap();
        let payload = if payloads.len() > 1 {
            payloads.remove(0)
        } else {
            payloads[0].clone()
        };
        Ok(Some(payload.to_string()))
    }
}

/// Matches only the listed queries; every match has an accessible entrance
struct IndexProvider {
    known: Vec<&'static str>,
    queries: Mutex<Vec<String>>,
}

impl IndexProvider {
    fn new(known: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            known,
            queries: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeodataProvider for IndexProvider {
    async fn text_search(
        &self,
        query: &str,
        _bias: Option<SearchBias>,
    ) -> Result<Option<PlaceRecord>> {
        self.queries.lock().unwrap().push(query.to_string());
        if !self.known.iter().any(|k| *k == query) {
            return Ok(None);
        }
        Ok(Some(PlaceRecord {
            id: format!("id-{query}"),
            display_name: query.to_string(),
            formatted_address: "Busan, South Korea".to_string(),
            latitude: 35.18,
            longitude: 129.08,
            accessibility: AccessibilityFlags {
                entrance: Some(true),
                restroom: Some(true),
                ..AccessibilityFlags::default()
            },
        }))
    }
}

fn plan_json(places: &[(&str, u8)]) -> Value {
    let places: Vec<Value> = places
        .iter()
        .map(|(name, score)| {
            json!({
                "name": name,
                "time": "10:00",
                "coords": [35.1796, 129.0756],
                "description": "Ramp at the main entrance",
                "accessibilityScore": score,
                "city": "Busan",
                "country": "South Korea",
                "countryCode": "KR"
            })
        })
        .collect();
    json!({
        "destination": "Busan, South Korea",
        "startDate": "2025-05-01",
        "endDate": "2025-05-02",
        "theme": "Seaside culture",
        "itinerary": [{
            "date": "2025-05-01",
            "dayOfWeek": "Thursday",
            "places": places
        }]
    })
}

fn wheelchair_profile() -> UserTravelProfile {
    UserTravelProfile {
        country: "South Korea".to_string(),
        city: "Busan".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
        travel_style: "culture".to_string(),
        disability_types: BTreeSet::from([DisabilityType::Physical]),
        is_wheelchair_user: true,
    }
}

fn orchestrator(llm: Arc<QueuedLlm>, provider: Arc<IndexProvider>) -> ValidationOrchestrator {
    let cache = Arc::new(TtlCache::new(Duration::from_secs(30 * 60)));
    let resolver = PlaceResolver::new(provider, cache);
    ValidationOrchestrator::new(
        Arc::new(ItineraryGenerator::new(llm)),
        Arc::new(resolver),
        ValidationConfig::default(),
    )
}

#[tokio::test]
async fn test_comma_prefix_resolves_in_first_round() {
    let llm = QueuedLlm::new(vec![plan_json(&[("Foo Museum (Foo City), Busan", 5)])]);
    let provider = IndexProvider::new(vec!["Foo Museum"]);

    let outcome = orchestrator(llm.clone(), provider.clone())
        .build(&wheelchair_profile())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Validated);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(
        provider.queries(),
        vec!["Foo Museum (Foo City), Busan", "Foo Museum"]
    );
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_place_is_replaced() {
    let llm = QueuedLlm::new(vec![
        plan_json(&[("Busan Museum, Busan", 5), ("Imaginary Tower, Busan", 5)]),
        plan_json(&[("Busan Museum, Busan", 5), ("BEXCO, Busan", 5)]),
    ]);
    let provider = IndexProvider::new(vec!["Busan Museum, Busan", "BEXCO, Busan"]);

    let outcome = orchestrator(llm.clone(), provider.clone())
        .build(&wheelchair_profile())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Validated);
    assert_eq!(outcome.rounds, 2);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);

    // the museum was cached in round one, so it is searched exactly once
    let museum_lookups = provider
        .queries()
        .iter()
        .filter(|q| q.as_str() == "Busan Museum, Busan")
        .count();
    assert_eq!(museum_lookups, 1);
}

#[tokio::test]
async fn test_pipeline_timeout_returns_error() {
    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn call_tool(
            &self,
            _system: &str,
            _user: &str,
            _tool: &ToolDefinition,
        ) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
    }

    let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
    let resolver = PlaceResolver::new(IndexProvider::new(vec![]), cache);
    let orchestrator = ValidationOrchestrator::new(
        Arc::new(ItineraryGenerator::new(Arc::new(SlowLlm))),
        Arc::new(resolver),
        ValidationConfig::default(),
    )
    .with_request_timeout(Duration::from_millis(50));

    let err = orchestrator.build(&wheelchair_profile()).await.unwrap_err();
    assert!(matches!(err, BarrierFreeError::Timeout { .. }));
}

#[tokio::test]
async fn test_cache_entries_expire_with_the_clock() {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(TtlCache::with_clock(
        Duration::from_secs(30 * 60),
        clock.clone(),
    ));
    let provider = IndexProvider::new(vec!["BEXCO"]);
    let resolver = PlaceResolver::new(provider.clone(), cache);
    let hint = barrierfree::models::LocationHint::new("Busan", "South Korea");

    resolver.resolve("BEXCO", &hint).await;
    clock.advance(Duration::from_secs(29 * 60));
    resolver.resolve("BEXCO", &hint).await;
    assert_eq!(provider.queries().len(), 1);

    clock.advance(Duration::from_secs(2 * 60));
    resolver.resolve("BEXCO", &hint).await;
    assert_eq!(provider.queries().len(), 2);
}

fn router(llm: Arc<QueuedLlm>, provider: Arc<IndexProvider>) -> axum::Router {
    let state = AppState {
        orchestrator: Arc::new(orchestrator(llm, provider)),
    };
    web::app(state, &ServerConfig::default()).unwrap()
}

fn post_recommend(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/recommend")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request_body() -> Value {
    json!({
        "country": "South Korea",
        "city": "Busan",
        "startDate": "2025-05-01",
        "endDate": "2025-05-02",
        "travelStyle": "culture",
        "isWheelchairUser": true,
        "disabilityTypes": ["physical"]
    })
}

#[tokio::test]
async fn test_recommend_returns_validated_plan() {
    let llm = QueuedLlm::new(vec![plan_json(&[("BEXCO, Busan", 5)])]);
    let app = router(llm, IndexProvider::new(vec!["BEXCO, Busan"]));

    let response = app.oneshot(post_recommend(&request_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "validated");
    assert_eq!(body["rounds"], 1);
    assert_eq!(body["warnings"], json!([]));
    assert_eq!(body["plan"]["itinerary"][0]["places"][0]["name"], "BEXCO, Busan");
}

#[tokio::test]
async fn test_recommend_reports_warnings_when_exhausted() {
    let llm = QueuedLlm::new(vec![plan_json(&[("Imaginary Tower, Busan", 5)])]);
    let app = router(llm, IndexProvider::new(vec![]));

    let response = app.oneshot(post_recommend(&request_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "exhausted");
    assert_eq!(body["rounds"], 3);
    assert_eq!(body["warnings"][0]["name"], "Imaginary Tower, Busan");
    assert_eq!(body["warnings"][0]["reason"], "not found in geodata provider");
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let llm = QueuedLlm::new(vec![plan_json(&[("BEXCO, Busan", 5)])]);
    let app = router(llm.clone(), IndexProvider::new(vec![]));

    let mut body = request_body();
    body.as_object_mut().unwrap().remove("travelStyle");
    let response = app.oneshot(post_recommend(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let envelope: ErrorEnvelope = serde_json::from_value(json_body(response).await).unwrap();
    assert!(envelope.detail.contains("travelStyle is required"));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = router(QueuedLlm::new(vec![json!({})]), IndexProvider::new(vec![]));
    let request = Request::builder()
        .method("POST")
        .uri("/api/recommend")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generation_failure_is_bad_gateway() {
    let llm = QueuedLlm::new(vec![json!({"theme": "missing everything else"})]);
    let app = router(llm, IndexProvider::new(vec![]));

    let response = app.oneshot(post_recommend(&request_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let envelope: ErrorEnvelope = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(
        envelope.error,
        "Failed to generate the travel plan on the server."
    );
    assert!(envelope.detail.starts_with("Generation error"));
}

#[tokio::test]
async fn test_banner() {
    let app = router(QueuedLlm::new(vec![json!({})]), IndexProvider::new(vec![]));
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("running"));
}
