//! Fallback requirement extraction from free text.
//!
//! Used when the language model did not call `extract_travel_requirement`: first the JSON
//! object in a model reply is tried, then simple patterns over the user's own words.

use regex::Regex;
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::types::{Requirement, RequirementDraft};

#[derive(Debug, Clone)]
pub struct RequirementExtractor {
    json_block: Regex,
    days: Regex,
    people: Regex,
    destination_zh: Regex,
    destination_en: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PlannerError::Config(format!("invalid pattern {}: {}", pattern, e)))
}

impl RequirementExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            json_block: compile(r"(?s)\{.*\}")?,
            days: compile(r"(?i)(\d+)\s*(?:天|日|days?\b)")?,
            people: compile(r"(?i)(\d+)\s*(?:人|位|people\b|persons?\b|travell?ers?\b|colleagues?\b)")?,
            destination_zh: compile(
                r"(?:去|到|前往|赴)\s*([^\s，,。！!？?\d]{1,20}?)(?:出差|考察|拜访|参观|开会|商务|接待|[，,。！!？?\s\d]|$)",
            )?,
            destination_en: compile(
                r"\b(?:[Tt]o|[Ii]n|[Vv]isit(?:ing)?)\s+([A-Z][\w-]*(?:\s+[A-Z][\w-]*)*)",
            )?,
        })
    }

    /// Parse the first `{...}` block of a model reply
    pub fn from_json_reply(&self, reply: &str) -> Option<RequirementDraft> {
        let block = self.json_block.find(reply)?;
        match serde_json::from_str::<RequirementDraft>(block.as_str()) {
            Ok(draft) => Some(draft),
            Err(err) => {
                debug!(target: "trip_planner::orchestrator", "requirement JSON rejected: {}", err);
                None
            }
        }
    }

    /// Pattern-based extraction. Numbers that are not found stay unset and default to 1.
    pub fn from_text(&self, text: &str) -> RequirementDraft {
        let number = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        };
        let destination = self
            .destination_zh
            .captures(text)
            .or_else(|| self.destination_en.captures(text))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        RequirementDraft {
            destination,
            duration_days: number(&self.days),
            group_size: number(&self.people),
            ..RequirementDraft::default()
        }
    }

    /// JSON reply first, then the text patterns. Errors when neither yields a destination.
    pub fn extract(&self, text: &str, model_reply: Option<&str>) -> Result<Requirement> {
        if let Some(draft) = model_reply.and_then(|reply| self.from_json_reply(reply)) {
            if !draft.destination.trim().is_empty() {
                return draft.validate();
            }
        }
        self.from_text(text).validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TravelMode;

    fn extractor() -> RequirementExtractor {
        RequirementExtractor::new().unwrap()
    }

    #[test]
    fn test_json_reply_wins() {
        let reply = "Here you go:\n```json\n{\"destination\": \"Jakarta\", \"duration_days\": 2, \"group_size\": 3, \"transportation_mode\": \"car\"}\n```";
        let requirement = extractor().extract("whatever", Some(reply)).unwrap();
        assert_eq!(requirement.destination(), "Jakarta");
        assert_eq!(requirement.duration_days(), 2);
        assert_eq!(requirement.group_size(), 3);
        assert_eq!(requirement.transportation_mode(), TravelMode::Driving);
    }

    #[test]
    fn test_chinese_text_rules() {
        let draft = extractor().from_text("我们3人要去雅加达出差2天，拜访工业园");
        assert_eq!(draft.destination, "雅加达");
        assert_eq!(draft.duration_days, Some(2));
        assert_eq!(draft.group_size, Some(3));
    }

    #[test]
    fn test_english_text_rules() {
        let draft = extractor().from_text("Trip to Kuala Lumpur for 4 days with 2 colleagues");
        assert_eq!(draft.destination, "Kuala Lumpur");
        assert_eq!(draft.duration_days, Some(4));
        assert_eq!(draft.group_size, Some(2));
    }

    #[test]
    fn test_missing_numbers_default_to_one() {
        let requirement = extractor().extract("Business meetings in Surabaya", None).unwrap();
        assert_eq!(requirement.destination(), "Surabaya");
        assert_eq!(requirement.duration_days(), 1);
        assert_eq!(requirement.group_size(), 1);
    }

    #[test]
    fn test_no_destination_is_validation_error() {
        let err = extractor().extract("开始规划", Some("not json")).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
    }
}
