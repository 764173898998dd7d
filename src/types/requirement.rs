use crate::error::{PlannerError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Preferred way of moving between stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Transit,
    Walking,
    Bicycling,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
        }
    }

    /// Lenient parsing for free-text modes coming back from the language model
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "transit" | "public transport" | "公共交通" | "地铁" => TravelMode::Transit,
            "walking" | "walk" | "步行" => TravelMode::Walking,
            "bicycling" | "bike" | "cycling" | "骑行" => TravelMode::Bicycling,
            _ => TravelMode::Driving,
        }
    }

    /// Human label used in plan notes and reports
    pub fn label(&self) -> &'static str {
        match self {
            TravelMode::Driving => "chartered car / self-drive",
            TravelMode::Transit => "public transit",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycle",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured trip requirement extracted for one planning round.
///
/// Values are immutable once built; a new extraction produces a new `Requirement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    destination: String,
    duration_days: u32,
    group_size: u32,
    transportation_mode: TravelMode,
    preferences: Vec<String>,
    constraints: Vec<String>,
    budget: Option<String>,
    special_notes: Vec<String>,
}

impl Requirement {
    pub fn new(destination: impl Into<String>, duration_days: u32, group_size: u32) -> Result<Self> {
        RequirementDraft {
            destination: destination.into(),
            duration_days: Some(duration_days),
            group_size: Some(group_size),
            ..RequirementDraft::default()
        }
        .validate()
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    pub fn transportation_mode(&self) -> TravelMode {
        self.transportation_mode
    }

    pub fn preferences(&self) -> &[String] {
        &self.preferences
    }

    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    pub fn budget(&self) -> Option<&str> {
        self.budget.as_deref()
    }

    pub fn special_notes(&self) -> &[String] {
        &self.special_notes
    }

    pub fn with_transportation_mode(mut self, mode: TravelMode) -> Self {
        self.transportation_mode = mode;
        self
    }

    pub fn with_preferences(mut self, preferences: Vec<String>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_constraints(mut self, constraints: Vec<String>) -> Self {
        self.constraints = constraints;
        self
    }
}

/// Loosely-typed requirement as produced by the language model or the `extract_travel_requirement` tool.
///
/// Numeric fields are optional here; [`RequirementDraft::validate`] applies defaults and
/// rejects drafts that cannot become a [`Requirement`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RequirementDraft {
    /// Destination city or region (e.g. "Jakarta")
    #[serde(default)]
    pub destination: String,
    /// Number of days in the trip (>= 1)
    #[serde(default)]
    pub duration_days: Option<u32>,
    /// Number of travelers (>= 1)
    #[serde(default)]
    pub group_size: Option<u32>,
    /// Preferred transportation mode: driving, transit, walking or bicycling
    #[serde(default)]
    pub transportation_mode: Option<String>,
    /// Free-text preferences in priority order
    #[serde(default)]
    pub preferences: Vec<String>,
    /// Hard constraints such as rush-hour limits or travel-time caps
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Budget descriptor, if mentioned
    #[serde(default)]
    pub budget: Option<String>,
    /// Special notes such as fixed appointments
    #[serde(default)]
    pub special_notes: Vec<String>,
}

impl RequirementDraft {
    pub fn validate(self) -> Result<Requirement> {
        let destination = self.destination.trim().to_string();
        if destination.is_empty() {
            return Err(PlannerError::Validation(
                "requirement is missing a destination".to_string(),
            ));
        }

        let duration_days = self.duration_days.unwrap_or(1);
        if duration_days == 0 {
            return Err(PlannerError::Validation(
                "duration_days must be at least 1".to_string(),
            ));
        }

        let group_size = self.group_size.unwrap_or(1);
        if group_size == 0 {
            return Err(PlannerError::Validation(
                "group_size must be at least 1".to_string(),
            ));
        }

        Ok(Requirement {
            destination,
            duration_days,
            group_size,
            transportation_mode: self
                .transportation_mode
                .as_deref()
                .map(TravelMode::from_label)
                .unwrap_or_default(),
            preferences: self.preferences,
            constraints: self.constraints,
            budget: self.budget.filter(|b| !b.trim().is_empty()),
            special_notes: self.special_notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults() {
        let requirement = RequirementDraft {
            destination: "  Jakarta ".to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(requirement.destination(), "Jakarta");
        assert_eq!(requirement.duration_days(), 1);
        assert_eq!(requirement.group_size(), 1);
        assert_eq!(requirement.transportation_mode(), TravelMode::Driving);
    }

    #[test]
    fn test_draft_rejects_missing_destination() {
        let err = RequirementDraft::default().validate().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_draft_rejects_zero_days() {
        let draft = RequirementDraft {
            destination: "Jakarta".to_string(),
            duration_days: Some(0),
            ..Default::default()
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(TravelMode::from_label("Transit"), TravelMode::Transit);
        assert_eq!(TravelMode::from_label("包车"), TravelMode::Driving);
        assert_eq!(TravelMode::Walking.to_string(), "walking");
    }
}
