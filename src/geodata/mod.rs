//! Geodata provider integration
//!
//! The resolver only needs one operation from a geodata source: a free-text
//! search with an optional circular location bias, returning the best match.

pub mod google_places;

use async_trait::async_trait;

use crate::Result;
use crate::models::{LocationHint, PlaceRecord};

pub use google_places::GooglePlacesClient;

/// Circular bias for a text search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBias {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

impl SearchBias {
    /// Bias around the hint's center, if it has one
    #[must_use]
    pub fn from_hint(hint: &LocationHint, radius_m: f64) -> Option<Self> {
        hint.center.map(|(latitude, longitude)| Self {
            latitude,
            longitude,
            radius_m,
        })
    }
}

#[async_trait]
pub trait GeodataProvider: Send + Sync {
    /// Best match for `query`, `Ok(None)` when the provider has no result.
    ///
    /// Transport and HTTP failures are `BarrierFreeError::Resolution`.
    async fn text_search(
        &self,
        query: &str,
        bias: Option<SearchBias>,
    ) -> Result<Option<PlaceRecord>>;
}
