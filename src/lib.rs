//! `BarrierFree` - accessibility-validated travel itinerary planning
//!
//! A generative planner drafts a multi-day itinerary, every stop is checked
//! against real-world accessibility data from a geodata provider, and failing
//! stops are sent back for replacement under a bounded retry policy.

pub mod accessibility;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod geodata;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use config::BarrierFreeConfig;
pub use error::BarrierFreeError;
pub use generation::{GenerationMode, ItineraryGenerator, LlmClient, OpenAiClient, PlanGenerator};
pub use geodata::{GeodataProvider, GooglePlacesClient, SearchBias};
pub use models::{ItineraryPlan, PlaceRecord, UserTravelProfile};
pub use orchestrator::{ItineraryOutcome, OutcomeStatus, ValidationOrchestrator};
pub use resolver::{PlaceResolver, Resolution};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, BarrierFreeError>;
