//! Building, modifying and checking plans.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::types::{DayPlan, Place, Plan, Requirement, DEFAULT_VISIT_MINUTES};

/// A day with more visit time than this gets a suggestion, in minutes
pub const LONG_DAY_MINUTES: u32 = 600;
/// A day with more places than this gets a suggestion
pub const CROWDED_DAY_PLACES: usize = 6;

/// A place as supplied by the language model or a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlaceInput {
    /// Display name of the place
    pub name: String,
    /// Street address; the name is used for lookups when empty
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    /// Planned time on site in minutes
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl PlaceInput {
    pub fn into_place(self, default_reasons: &[&str]) -> Place {
        let reasons = if self.reasons.is_empty() {
            default_reasons.iter().map(|r| r.to_string()).collect()
        } else {
            self.reasons
        };
        Place::new(self.name, self.address)
            .with_category(self.category.unwrap_or_else(|| "business".to_string()))
            .with_rating(self.rating)
            .with_description(
                self.description
                    .unwrap_or_else(|| "Recommended stop".to_string()),
            )
            .with_duration(self.duration.unwrap_or(DEFAULT_VISIT_MINUTES))
            .with_reasons(reasons)
    }
}

/// Spread places over the requested days.
///
/// Each day gets `max(1, places / days)` contiguous places and the last day takes any
/// remainder. A day left without places gets an exploration stop for the destination.
pub fn generate_initial_plan(requirement: &Requirement, places: Vec<Place>) -> Plan {
    let days_count = requirement.duration_days().max(1) as usize;
    let per_day = (places.len() / days_count).max(1);
    let destination = requirement.destination();
    let mode = requirement.transportation_mode();

    let mut remaining = places.into_iter();
    let days = (1..=days_count)
        .map(|day| {
            let mut day_places: Vec<Place> = if day == days_count {
                remaining.by_ref().collect()
            } else {
                remaining.by_ref().take(per_day).collect()
            };
            if day_places.is_empty() {
                day_places.push(Place::exploration(destination));
            }
            DayPlan::new(
                day as u32,
                format!("Day {}: business visits in {}", day, destination),
                day_places,
            )
            .with_notes(vec![format!("Travel by {}", mode.label())])
        })
        .collect();

    let mut plan = Plan::new(requirement.clone(), days);
    plan.important_notes = vec![
        format!("Plan on travelling by {}", mode.label()),
        "Adjust visit times to your confirmed meetings".to_string(),
        "Book hotels and meeting rooms in advance".to_string(),
    ];
    plan
}

/// A change requested to the current plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanModification {
    /// Append a place to a day
    AddPlace { day: u32, place: PlaceInput },
    /// Remove every place with this name from a day
    RemovePlace { day: u32, name: String },
    /// Rename a day's theme
    ChangeTheme { day: u32, theme: String },
    /// Replace the places of day 1, 2, ... in order; extra entries are ignored
    ReplacePlaces { days: Vec<Vec<PlaceInput>> },
}

impl PlanModification {
    pub fn kind(&self) -> &'static str {
        match self {
            PlanModification::AddPlace { .. } => "add_place",
            PlanModification::RemovePlace { .. } => "remove_place",
            PlanModification::ChangeTheme { .. } => "change_theme",
            PlanModification::ReplacePlaces { .. } => "replace_places",
        }
    }
}

fn day_not_found(day: u32) -> PlannerError {
    PlannerError::Validation(format!("The plan has no day {}", day))
}

/// Apply a modification to a copy of `current`. The result has the next version number;
/// `current` is left untouched.
pub fn modify_plan(current: &Plan, modification: PlanModification) -> Result<Plan> {
    let mut plan = current.next_version();

    match modification {
        PlanModification::AddPlace { day, place } => {
            let target = plan.day_mut(day).ok_or_else(|| day_not_found(day))?;
            target.push_place(place.into_place(&["Requested by you"]));
        }
        PlanModification::RemovePlace { day, name } => {
            let target = plan.day_mut(day).ok_or_else(|| day_not_found(day))?;
            if target.remove_place(&name) == 0 {
                return Err(PlannerError::Validation(format!(
                    "Day {} has no place named '{}'",
                    day, name
                )));
            }
        }
        PlanModification::ChangeTheme { day, theme } => {
            if theme.trim().is_empty() {
                return Err(PlannerError::Validation(
                    "A day theme cannot be empty".to_string(),
                ));
            }
            plan.day_mut(day)
                .ok_or_else(|| day_not_found(day))?
                .set_theme(theme);
        }
        PlanModification::ReplacePlaces { days } => {
            for (target, places) in plan.days.iter_mut().zip(days) {
                target.replace_places(
                    places
                        .into_iter()
                        .map(|p| p.into_place(&["Matches your requirements"]))
                        .collect(),
                );
            }
        }
    }

    plan.refresh_summary();
    let note = format!("Adjusted based on your feedback (version {})", plan.version);
    if !plan.important_notes.contains(&note) {
        plan.important_notes.push(note);
    }
    Ok(plan)
}

/// Outcome of [`validate_plan`]. Only `issues` make a plan invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

pub fn validate_plan(plan: &Plan) -> ValidationReport {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    let expected_days = plan.requirement.duration_days() as usize;
    if plan.days.len() != expected_days {
        issues.push(format!(
            "The plan covers {} days but the trip lasts {}",
            plan.days.len(),
            expected_days
        ));
    }

    for day in &plan.days {
        let places = day.places();
        if places.is_empty() {
            issues.push(format!("Day {} has no places", day.day));
        }
        let sum: u32 = places.iter().map(|p| p.estimated_duration).sum();
        if sum != day.total_estimated_minutes() {
            issues.push(format!(
                "Day {} total of {} min does not match its places ({} min)",
                day.day,
                day.total_estimated_minutes(),
                sum
            ));
        }
        if sum > LONG_DAY_MINUTES {
            suggestions.push(format!(
                "Day {} has {:.1} hours of visits; consider moving a stop",
                day.day,
                f64::from(sum) / 60.0
            ));
        }
        if places.len() > CROWDED_DAY_PLACES {
            suggestions.push(format!(
                "Day {} has {} places; consider fewer stops",
                day.day,
                places.len()
            ));
        }
    }

    ValidationReport {
        valid: issues.is_empty(),
        issues,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(n: usize) -> Vec<Place> {
        (1..=n)
            .map(|i| Place::new(format!("Place {i}"), format!("Street {i}")).with_duration(60))
            .collect()
    }

    fn input(name: &str) -> PlaceInput {
        PlaceInput {
            name: name.to_string(),
            address: String::new(),
            category: None,
            rating: None,
            description: None,
            duration: Some(45),
            reasons: vec![],
        }
    }

    #[test]
    fn test_places_split_evenly() {
        let requirement = Requirement::new("Jakarta", 2, 3).unwrap();
        let plan = generate_initial_plan(&requirement, places(4));
        assert_eq!(plan.days.len(), 2);
        assert_eq!(plan.days[0].places().len(), 2);
        assert_eq!(plan.days[1].places()[0].name, "Place 3");
        assert_eq!(plan.days[1].total_estimated_minutes(), 120);
        assert_eq!(plan.version, 1);
    }

    #[test]
    fn test_remainder_goes_to_last_day() {
        let requirement = Requirement::new("Jakarta", 2, 1).unwrap();
        let plan = generate_initial_plan(&requirement, places(5));
        assert_eq!(plan.days[0].places().len(), 2);
        assert_eq!(plan.days[1].places().len(), 3);
        assert_eq!(plan.total_places(), 5);
    }

    #[test]
    fn test_days_without_places_get_exploration() {
        let requirement = Requirement::new("Surabaya", 3, 1).unwrap();
        let plan = generate_initial_plan(&requirement, places(1));
        assert_eq!(plan.days[0].places()[0].name, "Place 1");
        assert_eq!(plan.days[1].places()[0].name, "Surabaya city center");
        assert!(plan.days.iter().all(|d| !d.places().is_empty()));
        assert!(validate_plan(&plan).valid);
    }

    #[test]
    fn test_modify_returns_new_version() {
        let requirement = Requirement::new("Jakarta", 2, 3).unwrap();
        let original = generate_initial_plan(&requirement, places(4));

        let added = modify_plan(
            &original,
            PlanModification::AddPlace {
                day: 1,
                place: input("Plaza Senayan"),
            },
        )
        .unwrap();
        assert_eq!(added.version, 2);
        assert_eq!(added.days[0].places().len(), 3);
        assert_eq!(added.days[0].total_estimated_minutes(), 165);
        assert!(added
            .important_notes
            .iter()
            .any(|n| n.contains("version 2")));
        assert_eq!(original.days[0].places().len(), 2);
        assert_eq!(original.version, 1);

        let themed = modify_plan(
            &added,
            PlanModification::ChangeTheme {
                day: 2,
                theme: "Port visit".to_string(),
            },
        )
        .unwrap();
        assert_eq!(themed.version, 3);
        assert_eq!(themed.days[1].theme, "Port visit");
    }

    #[test]
    fn test_modify_rejects_unknown_targets() {
        let requirement = Requirement::new("Jakarta", 1, 1).unwrap();
        let plan = generate_initial_plan(&requirement, places(2));

        let err = modify_plan(
            &plan,
            PlanModification::RemovePlace {
                day: 5,
                name: "Place 1".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.is_user_facing());

        let err = modify_plan(
            &plan,
            PlanModification::RemovePlace {
                day: 1,
                name: "Nope".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_replace_places_recomputes_totals() {
        let requirement = Requirement::new("Jakarta", 2, 1).unwrap();
        let plan = generate_initial_plan(&requirement, places(2));
        let replaced = modify_plan(
            &plan,
            PlanModification::ReplacePlaces {
                days: vec![vec![input("A"), input("B")]],
            },
        )
        .unwrap();
        assert_eq!(replaced.days[0].total_estimated_minutes(), 90);
        assert_eq!(replaced.days[1].places()[0].name, "Place 2");
    }

    #[test]
    fn test_modification_wire_format() {
        let modification: PlanModification = serde_json::from_value(serde_json::json!({
            "type": "remove_place",
            "day": 1,
            "name": "Plant"
        }))
        .unwrap();
        assert_eq!(modification.kind(), "remove_place");
    }

    #[test]
    fn test_validation_flags_issues_and_suggestions() {
        let requirement = Requirement::new("Jakarta", 2, 1).unwrap();
        let crowded: Vec<Place> = (0..7)
            .map(|i| Place::new(format!("P{i}"), "x").with_duration(100))
            .collect();
        let plan = Plan::new(requirement, vec![DayPlan::new(1, "Busy", crowded)]);

        let report = validate_plan(&plan);
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.suggestions.len(), 2);
    }
}
