//! Itinerary plan model as produced by the generative planner

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::UserTravelProfile;

/// Complete multi-day plan; always replaced wholesale, never patched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryPlan {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub theme: String,
    pub itinerary: Vec<DayPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub places: Vec<Place>,
}

/// A scheduled stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    pub time: String,
    /// `[latitude, longitude]`
    pub coords: [f64; 2],
    pub description: String,
    /// Self-reported by the planner, 1..=5
    pub accessibility_score: u8,
    pub city: String,
    pub country: String,
    pub country_code: String,
}

/// One stop the planner has to replace in the next round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementRequest {
    pub date: NaiveDate,
    pub original_place: String,
    pub reason: String,
}

impl Place {
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coords[0]
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coords[1]
    }
}

impl ItineraryPlan {
    /// Iterate over every place together with the date of its day
    pub fn places(&self) -> impl Iterator<Item = (NaiveDate, &Place)> {
        self.itinerary
            .iter()
            .flat_map(|day| day.places.iter().map(move |place| (day.date, place)))
    }

    #[must_use]
    pub fn place_count(&self) -> usize {
        self.itinerary.iter().map(|day| day.places.len()).sum()
    }

    /// Structural checks a generated plan must pass before it is accepted.
    ///
    /// Returns a description of the first violation found.
    pub fn check_shape(&self, profile: &UserTravelProfile) -> Result<(), String> {
        if self.itinerary.is_empty() {
            return Err("itinerary contains no days".to_string());
        }

        for day in &self.itinerary {
            if !profile.covers(day.date) {
                return Err(format!(
                    "day {} lies outside the trip {}..={}",
                    day.date, profile.start_date, profile.end_date
                ));
            }

            for place in &day.places {
                if place.name.trim().is_empty() {
                    return Err(format!("unnamed place on {}", day.date));
                }
                if !(1..=5).contains(&place.accessibility_score) {
                    return Err(format!(
                        "place '{}' has accessibilityScore {} outside 1..=5",
                        place.name, place.accessibility_score
                    ));
                }
                let [lat, lng] = place.coords;
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    return Err(format!(
                        "place '{}' has invalid coordinates ({lat}, {lng})",
                        place.name
                    ));
                }
            }
        }

        Ok(())
    }
}
