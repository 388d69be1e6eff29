//! Traveller profile: destination, dates and accessibility needs

use chrono::NaiveDate;
use serde::de::IntoDeserializer;
use serde::de::value::Error as ValueError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Disability categories a traveller can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabilityType {
    Physical,
    BrainLesion,
    Visual,
    Hearing,
    Speech,
    Intellectual,
    Autism,
    Mental,
    Kidney,
    Cardiac,
    Respiratory,
    Liver,
    Ostomy,
    Epilepsy,
}

impl DisabilityType {
    pub const ALL: [DisabilityType; 14] = [
        DisabilityType::Physical,
        DisabilityType::BrainLesion,
        DisabilityType::Visual,
        DisabilityType::Hearing,
        DisabilityType::Speech,
        DisabilityType::Intellectual,
        DisabilityType::Autism,
        DisabilityType::Mental,
        DisabilityType::Kidney,
        DisabilityType::Cardiac,
        DisabilityType::Respiratory,
        DisabilityType::Liver,
        DisabilityType::Ostomy,
        DisabilityType::Epilepsy,
    ];

    /// Human readable label used in prompts and logs
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DisabilityType::Physical => "physical disability",
            DisabilityType::BrainLesion => "brain lesion disability",
            DisabilityType::Visual => "visual impairment",
            DisabilityType::Hearing => "hearing impairment",
            DisabilityType::Speech => "speech impairment",
            DisabilityType::Intellectual => "intellectual disability",
            DisabilityType::Autism => "autism spectrum disorder",
            DisabilityType::Mental => "mental illness",
            DisabilityType::Kidney => "kidney disease",
            DisabilityType::Cardiac => "cardiac disease",
            DisabilityType::Respiratory => "respiratory disease",
            DisabilityType::Liver => "liver disease",
            DisabilityType::Ostomy => "ostomy",
            DisabilityType::Epilepsy => "epilepsy",
        }
    }
}

impl fmt::Display for DisabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses the wire identifier, e.g. `brain_lesion`
impl FromStr for DisabilityType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisabilityType::deserialize(s.trim().into_deserializer())
    }
}

/// Immutable input describing one itinerary request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTravelProfile {
    pub country: String,
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub travel_style: String,
    #[serde(default)]
    pub disability_types: BTreeSet<DisabilityType>,
    #[serde(default)]
    pub is_wheelchair_user: bool,
}

impl UserTravelProfile {
    /// Whether any accessibility need was declared
    #[must_use]
    pub fn requires_accessibility(&self) -> bool {
        self.is_wheelchair_user || !self.disability_types.is_empty()
    }

    /// Inclusive date range check used on generated plans
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Number of travel days, inclusive of both ends
    #[must_use]
    pub fn trip_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}
