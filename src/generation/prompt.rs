//! Instruction text and output schema for the planning provider

use serde_json::{Value, json};

use super::requirements::requirement_text;
use crate::models::{ItineraryPlan, ReplacementRequest, UserTravelProfile};

pub const TOOL_NAME: &str = "create_accessible_itinerary";
pub const TOOL_DESCRIPTION: &str =
    "Create a detailed barrier-free travel itinerary for the traveller as structured JSON.";

pub const SYSTEM_PROMPT: &str = "You are an expert travel planner specialised in barrier-free \
travel for people with disabilities. You always answer by calling the provided tool with a \
complete itinerary and never add free text.";

/// How place names must be written so the geodata lookup can find them
pub const NAMING_CONVENTION: &str = "Place naming rules:
- Write every place name as \"Official name, city\", exactly as it appears on Google Maps.
- Use the official English or romanised name; when the local-script name differs, put it in parentheses after the official name.
- For chain stores, cafes and restaurants include the branch name (e.g. \"Starbucks Haeundae Beach branch, Busan\").
- Never add descriptive suffixes such as \"area\", \"street food tour\" or \"view point\" to a name.";

/// Minimum self-reported score a replacement place must carry
pub const REPLACEMENT_MIN_SCORE: u8 = 4;

fn trip_block(profile: &UserTravelProfile) -> String {
    format!(
        "Trip:\n- Destination: {city}, {country}\n- Dates: {start} to {end} ({days} days)\n- Travel style: {style}",
        city = profile.city,
        country = profile.country,
        start = profile.start_date,
        end = profile.end_date,
        days = profile.trip_days(),
        style = profile.travel_style,
    )
}

/// Instruction for the first draft
#[must_use]
pub fn initial_instruction(profile: &UserTravelProfile) -> String {
    format!(
        "Create a detailed and realistic itinerary for {city}, {country}.\n\n\
{trip}\n\n\
Accessibility requirements:\n{requirements}\n\n\
Plan one entry per calendar day from the start date to the end date, each with a \
dayOfWeek label. Give every place a visit time (HH:MM), its [latitude, longitude], a short \
description that mentions its accessibility facilities, and an accessibilityScore from 1 \
(not accessible) to 5 (fully accessible).\n\n\
{naming}",
        city = profile.city,
        country = profile.country,
        trip = trip_block(profile),
        requirements = requirement_text(profile),
        naming = NAMING_CONVENTION,
    )
}

/// Instruction for replacing flagged places in an existing plan
pub fn refine_instruction(
    profile: &UserTravelProfile,
    replacements: &[ReplacementRequest],
    current: &ItineraryPlan,
) -> serde_json::Result<String> {
    let replacements = serde_json::to_string_pretty(replacements)?;
    let current = serde_json::to_string_pretty(current)?;

    Ok(format!(
        "Some places in the existing itinerary failed the accessibility check and must be replaced.\n\n\
{trip}\n\n\
Accessibility requirements:\n{requirements}\n\n\
Places to replace (date, originalPlace, reason):\n{replacements}\n\n\
Current itinerary:\n{current}\n\n\
Rules:\n\
- Replace ONLY the places listed above, each with a place in {city} of a similar kind whose \
wheelchair accessibility is certain.\n\
- Every replacement must have an accessibilityScore of {min_score} or higher.\n\
- Keep every other place, the visit times and the day structure exactly as they are.\n\
- Return the complete updated itinerary, not only the replacements.\n\n\
{naming}",
        trip = trip_block(profile),
        requirements = requirement_text(profile),
        city = profile.city,
        min_score = REPLACEMENT_MIN_SCORE,
        naming = NAMING_CONVENTION,
    ))
}

/// JSON schema of the tool arguments; mirrors `ItineraryPlan`
#[must_use]
pub fn itinerary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "destination": { "type": "string", "description": "City and country of the trip" },
            "startDate": { "type": "string", "description": "YYYY-MM-DD" },
            "endDate": { "type": "string", "description": "YYYY-MM-DD" },
            "theme": { "type": "string", "description": "Short title of the trip" },
            "itinerary": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "date": { "type": "string", "description": "YYYY-MM-DD" },
                        "dayOfWeek": { "type": "string", "description": "e.g. Monday" },
                        "places": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": { "type": "string", "description": "Official name, city" },
                                    "time": { "type": "string", "description": "HH:MM" },
                                    "coords": {
                                        "type": "array",
                                        "items": { "type": "number" },
                                        "minItems": 2,
                                        "maxItems": 2,
                                        "description": "[latitude, longitude]"
                                    },
                                    "description": { "type": "string" },
                                    "accessibilityScore": { "type": "integer", "minimum": 1, "maximum": 5 },
                                    "city": { "type": "string" },
                                    "country": { "type": "string" },
                                    "countryCode": { "type": "string", "description": "ISO 3166-1 alpha-2" }
                                },
                                "required": [
                                    "name", "time", "coords", "description",
                                    "accessibilityScore", "city", "country", "countryCode"
                                ]
                            }
                        }
                    },
                    "required": ["date", "dayOfWeek", "places"]
                }
            }
        },
        "required": ["destination", "startDate", "endDate", "theme", "itinerary"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::itinerary::fixtures::{place, plan};
    use crate::models::DisabilityType;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn profile() -> UserTravelProfile {
        UserTravelProfile {
            country: "South Korea".to_string(),
            city: "Busan".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            travel_style: "culture".to_string(),
            disability_types: BTreeSet::from([DisabilityType::Cardiac]),
            is_wheelchair_user: true,
        }
    }

    #[test]
    fn test_initial_instruction_embeds_profile() {
        let text = initial_instruction(&profile());
        assert!(text.contains("Busan, South Korea"));
        assert!(text.contains("2025-05-01 to 2025-05-02 (2 days)"));
        assert!(text.contains("Travel style: culture"));
        assert!(text.contains("AED available on site"));
        assert!(text.contains("Official name, city"));
    }

    #[test]
    fn test_refine_instruction_carries_context() {
        let replacements = vec![ReplacementRequest {
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            original_place: "Old Fort, Busan".to_string(),
            reason: "self-reported accessibility score 2 is below 4".to_string(),
        }];
        let current = plan(vec![place("Old Fort, Busan", 2)]);

        let text = refine_instruction(&profile(), &replacements, &current).unwrap();
        assert!(text.contains("\"originalPlace\": \"Old Fort, Busan\""));
        assert!(text.contains("\"theme\": \"Seaside culture\""));
        assert!(text.contains("Replace ONLY the places listed above"));
        assert!(text.contains("accessibilityScore of 4 or higher"));
    }

    #[test]
    fn test_schema_requires_every_place_field() {
        let schema = itinerary_schema();
        let required = &schema["properties"]["itinerary"]["items"]["properties"]["places"]["items"]
            ["required"];
        let required: Vec<_> = required
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required.len(), 8);
        assert!(required.contains(&"accessibilityScore"));
        assert!(required.contains(&"countryCode"));
    }
}
