//! Data models for the BarrierFree planning service
//!
//! This module contains the core domain models organized by concern:
//! - Profile: who travels where, when, and with which needs
//! - Itinerary: the generated multi-day plan and replacement requests
//! - Place: geodata records, accessibility flags and location hints

pub mod itinerary;
pub mod place;
pub mod profile;

// Re-export all public types for convenient access
pub use itinerary::{DayPlan, ItineraryPlan, Place, ReplacementRequest};
pub use place::{AccessibilityFlags, LocationHint, PlaceRecord};
pub use profile::{DisabilityType, UserTravelProfile};
