//! Geodata place records and the location hint used to bias lookups

use serde::{Deserialize, Serialize};

use super::Place;

/// Three-valued accessibility flags; `None` means the provider has no data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityFlags {
    pub entrance: Option<bool>,
    pub parking: Option<bool>,
    pub restroom: Option<bool>,
    pub seating: Option<bool>,
}

/// Canonical provider record a free-text place name resolved to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    /// Provider place identity
    pub id: String,
    pub display_name: String,
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accessibility: AccessibilityFlags,
}

/// Where a place is expected to be
#[derive(Debug, Clone, PartialEq)]
pub struct LocationHint {
    pub city: String,
    pub country: String,
    /// `(latitude, longitude)` used as the search bias center
    pub center: Option<(f64, f64)>,
}

impl LocationHint {
    #[must_use]
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
            center: None,
        }
    }

    #[must_use]
    pub fn with_center(mut self, latitude: f64, longitude: f64) -> Self {
        self.center = Some((latitude, longitude));
        self
    }

    /// Hint for a planned stop: its city and country, biased towards its coordinates
    #[must_use]
    pub fn for_place(place: &Place) -> Self {
        Self::new(place.city.clone(), place.country.clone())
            .with_center(place.latitude(), place.longitude())
    }

    /// Round the center for cache key generation
    #[must_use]
    pub fn rounded_center(&self, precision: u32) -> Option<(f64, f64)> {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(2));
        self.center.map(|(lat, lng)| {
            (
                (lat * multiplier).round() / multiplier,
                (lng * multiplier).round() / multiplier,
            )
        })
    }

    /// Stable key fragment; coordinates are rounded to ~1 km
    #[must_use]
    pub fn cache_key(&self) -> String {
        let city = self.city.trim().to_lowercase();
        let country = self.country.trim().to_lowercase();
        match self.rounded_center(2) {
            Some((lat, lng)) => format!("{city}|{country}|{lat:.2}:{lng:.2}"),
            None => format!("{city}|{country}"),
        }
    }
}
