//! Facility checklists per disability category.
//!
//! Static data only: adding a category means adding a row here.

use crate::models::{DisabilityType, UserTravelProfile};

pub struct CategoryRequirement {
    pub category: DisabilityType,
    pub checklist: &'static [&'static str],
}

pub const WHEELCHAIR_CHECKLIST: &[&str] = &[
    "step-free entrance or a permanent ramp",
    "elevator to every floor that is part of the visit",
    "wheelchair accessible restroom",
    "doorways and paths at least 80 cm wide",
    "accessible parking or an accessible drop-off point",
];

pub const CATEGORY_REQUIREMENTS: [CategoryRequirement; 14] = [
    CategoryRequirement {
        category: DisabilityType::Physical,
        checklist: &[
            "step-free access or ramps",
            "elevators instead of stairs",
            "accessible restrooms with grab bars",
            "seating areas along longer walking routes",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::BrainLesion,
        checklist: &[
            "step-free access and handrails",
            "wheelchair or mobility aid rental on site",
            "short, level walking distances",
            "accessible restrooms",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Visual,
        checklist: &[
            "tactile paving or guide paths",
            "braille or audio guides",
            "guide dogs admitted",
            "staff assistance available on request",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Hearing,
        checklist: &[
            "written or visual information boards",
            "sign language or captioned guides",
            "visual alarm signals",
            "hearing loop or assistive listening devices",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Speech,
        checklist: &[
            "written or app-based ordering and ticketing",
            "staff comfortable with written communication",
            "pictogram signage",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Intellectual,
        checklist: &[
            "easy-read signage and pictograms",
            "simple, clearly marked routes",
            "patient staff assistance",
            "calm areas to rest",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Autism,
        checklist: &[
            "quiet or sensory-friendly rooms",
            "low-crowd time slots",
            "predictable layout with clear signage",
            "option to pre-book and skip queues",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Mental,
        checklist: &[
            "quiet rest areas",
            "avoid overcrowded venues",
            "flexible schedule with easy exits",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Kidney,
        checklist: &[
            "dialysis facility reachable from the itinerary",
            "frequent restroom access",
            "low-sodium meal options",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Cardiac,
        checklist: &[
            "minimal stairs and steep slopes",
            "AED available on site",
            "frequent rest spots with seating",
            "nearby medical facility",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Respiratory,
        checklist: &[
            "good air quality and no smoking areas",
            "minimal uphill walking",
            "power outlets for oxygen or nebulizer equipment",
            "nearby medical facility",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Liver,
        checklist: &[
            "frequent rest opportunities",
            "meal options without alcohol",
            "nearby medical facility",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Ostomy,
        checklist: &[
            "ostomy-friendly or spacious accessible restrooms",
            "restrooms available throughout the visit",
        ],
    },
    CategoryRequirement {
        category: DisabilityType::Epilepsy,
        checklist: &[
            "no strobe or flashing light shows",
            "first-aid staff on site",
            "quiet rest areas",
        ],
    },
];

/// Checklist for one category
#[must_use]
pub fn checklist_for(category: DisabilityType) -> &'static [&'static str] {
    CATEGORY_REQUIREMENTS
        .iter()
        .find(|row| row.category == category)
        .map(|row| row.checklist)
        .unwrap_or_default()
}

fn push_section(out: &mut String, heading: &str, items: &[&str]) {
    out.push_str(heading);
    out.push('\n');
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
}

/// Natural-language requirement block for the planner instruction
#[must_use]
pub fn requirement_text(profile: &UserTravelProfile) -> String {
    if !profile.requires_accessibility() {
        return "No specific accessibility needs were declared. Recommend generally accessible places."
            .to_string();
    }

    let mut out = String::new();
    if profile.is_wheelchair_user {
        push_section(
            &mut out,
            "The traveller uses a wheelchair. Every place must guarantee:",
            WHEELCHAIR_CHECKLIST,
        );
    }
    for category in &profile.disability_types {
        push_section(
            &mut out,
            &format!("For {}, prefer places with:", category.label()),
            checklist_for(*category),
        );
    }
    out.trim_end().to_string()
}
