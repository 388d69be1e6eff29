//! Accessibility scoring of geodata feature flags

use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::AccessibilityFlags;

pub const FEATURE_ENTRANCE: &str = "wheelchair accessible entrance";
pub const FEATURE_PARKING: &str = "wheelchair accessible parking";
pub const FEATURE_RESTROOM: &str = "wheelchair accessible restroom";
pub const FEATURE_SEATING: &str = "wheelchair accessible seating";

pub const ISSUE_NO_ENTRANCE: &str = "no wheelchair accessible entrance";
pub const ISSUE_NO_RESTROOM: &str = "no wheelchair accessible restroom";

/// Result of scoring one place's feature flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessibilityAssessment {
    pub features: BTreeSet<String>,
    pub issues: BTreeSet<String>,
    pub score: u32,
    pub entrance: EntranceStatus,
}

/// What the provider says about the entrance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntranceStatus {
    Accessible,
    /// The provider explicitly reports no accessible entrance
    Inaccessible,
    /// The provider has no accessibility data for the entrance
    Unknown,
}

impl EntranceStatus {
    #[must_use]
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => EntranceStatus::Accessible,
            Some(false) => EntranceStatus::Inaccessible,
            None => EntranceStatus::Unknown,
        }
    }

    /// Diagnostic reason for anything but an accessible entrance
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            EntranceStatus::Accessible => "wheelchair accessible entrance confirmed",
            EntranceStatus::Inaccessible => "explicitly inaccessible entrance",
            EntranceStatus::Unknown => "no accessibility data recorded",
        }
    }
}

impl AccessibilityAssessment {
    /// Only an explicitly accessible entrance counts
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.entrance == EntranceStatus::Accessible
    }
}

/// Point rule: entrance +3, parking/restroom/seating +1 each.
#[must_use]
pub fn score(flags: &AccessibilityFlags) -> AccessibilityAssessment {
    let mut features = BTreeSet::new();
    let mut issues = BTreeSet::new();
    let mut points = 0;

    match flags.entrance {
        Some(true) => {
            points += 3;
            features.insert(FEATURE_ENTRANCE.to_string());
        }
        Some(false) => {
            issues.insert(ISSUE_NO_ENTRANCE.to_string());
        }
        None => {}
    }

    if flags.parking == Some(true) {
        points += 1;
        features.insert(FEATURE_PARKING.to_string());
    }

    match flags.restroom {
        Some(true) => {
            points += 1;
            features.insert(FEATURE_RESTROOM.to_string());
        }
        Some(false) => {
            issues.insert(ISSUE_NO_RESTROOM.to_string());
        }
        None => {}
    }

    if flags.seating == Some(true) {
        points += 1;
        features.insert(FEATURE_SEATING.to_string());
    }

    AccessibilityAssessment {
        features,
        issues,
        score: points,
        entrance: EntranceStatus::from_flag(flags.entrance),
    }
}
