use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use barrierfree::api::AppState;
use barrierfree::{
    BarrierFreeConfig, GooglePlacesClient, ItineraryGenerator, OpenAiClient, PlaceResolver,
    TtlCache, ValidationOrchestrator, telemetry, web,
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply
    dotenvy::dotenv().ok();

    let config = BarrierFreeConfig::load().context("Failed to load configuration")?;
    let _telemetry = telemetry::init(&config.logging)?;

    let geodata = GooglePlacesClient::new(&config.geodata)?;
    let cache = Arc::new(TtlCache::new(config.cache.ttl()));
    let resolver = PlaceResolver::from_config(Arc::new(geodata), cache, &config.geodata);

    let llm = OpenAiClient::new(&config.generation)?;
    let generator = ItineraryGenerator::new(Arc::new(llm));

    let orchestrator =
        ValidationOrchestrator::from_config(Arc::new(generator), Arc::new(resolver), &config);

    info!(
        "Starting barrierfree {} (model {}, {} validation retries)",
        barrierfree::VERSION,
        config.generation.model,
        config.validation.max_retries
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };
    web::run(state, &config.server).await
}
