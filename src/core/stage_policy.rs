//! Decides whether a raw user turn asks to start planning.
//!
//! Substring matching on a fixed phrase list can misfire; it sits behind
//! [`PlanningIntentPolicy`] so a classifier can replace it without touching the
//! orchestrator.

/// Planning-intent phrases recognised in user turns
pub const PLANNING_KEYWORDS: &[&str] = &[
    "开始规划",
    "生成规划",
    "规划行程",
    "制定计划",
    "生成行程",
    "规划安排",
    "start planning",
    "generate the plan",
    "generate a plan",
    "plan the trip",
    "make the itinerary",
    "build the itinerary",
];

pub trait PlanningIntentPolicy: Send + Sync {
    fn wants_planning(&self, text: &str) -> bool;
}

/// Case-insensitive substring match against a phrase list
#[derive(Debug, Clone)]
pub struct KeywordIntentPolicy {
    keywords: Vec<String>,
}

impl KeywordIntentPolicy {
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordIntentPolicy {
    fn default() -> Self {
        Self::new(PLANNING_KEYWORDS.iter().copied())
    }
}

impl PlanningIntentPolicy for KeywordIntentPolicy {
    fn wants_planning(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}
