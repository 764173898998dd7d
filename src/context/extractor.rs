//! Token-light digests of a conversation's planning state for the language model.

use super::planning_context::LogSummary;
use crate::core::conversation::{Conversation, PlanningStage};
use crate::types::{RiskLevel, ScheduledSegment, TravelMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementDigest {
    pub destination: String,
    pub duration_days: u32,
    pub group_size: u32,
    pub transportation_mode: TravelMode,
    pub preferences: Vec<String>,
    pub constraints: Vec<String>,
    pub special_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDigest {
    pub id: String,
    pub title: String,
    pub days_count: usize,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningDigest {
    pub stage: PlanningStage,
    pub requirement: Option<RequirementDigest>,
    pub planning_log_summary: LogSummary,
    pub plan_summary: Option<PlanDigest>,
}

impl PlanningDigest {
    /// Render as a block appended to a system prompt
    pub fn to_prompt_block(&self) -> String {
        let body = serde_json::to_string_pretty(self).unwrap_or_default();
        format!("Current planning context:\n{}", body)
    }
}

/// Summarize the stage, requirement, log and plan of a conversation without the full history
pub fn planning_digest(conversation: &Conversation) -> PlanningDigest {
    PlanningDigest {
        stage: conversation.stage,
        requirement: conversation
            .current_requirement
            .as_ref()
            .map(|r| RequirementDigest {
                destination: r.destination().to_string(),
                duration_days: r.duration_days(),
                group_size: r.group_size(),
                transportation_mode: r.transportation_mode(),
                preferences: r.preferences().to_vec(),
                constraints: r.constraints().to_vec(),
                special_notes: r.special_notes().to_vec(),
            }),
        planning_log_summary: conversation.context.summarize(),
        plan_summary: conversation.current_plan.as_ref().map(|p| PlanDigest {
            id: p.id.clone(),
            title: p.title.clone(),
            days_count: p.days.len(),
            version: p.version,
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskySegment {
    pub from: String,
    pub to: String,
    pub time: String,
    pub risk_cause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_traffic: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskCounts {
    pub fn tally(segments: &[ScheduledSegment]) -> Self {
        segments
            .iter()
            .fold(RiskCounts::default(), |mut counts, segment| {
                match segment.risk_level() {
                    RiskLevel::High => counts.high += 1,
                    RiskLevel::Medium => counts.medium += 1,
                    RiskLevel::Low => counts.low += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficRiskContext {
    pub high_risk_segments: Vec<RiskySegment>,
    pub medium_risk_segments: Vec<RiskySegment>,
    pub total_segments: usize,
    pub risk_summary: RiskCounts,
}

/// Group high and medium risk segments for the language model
pub fn traffic_risk_context(segments: &[ScheduledSegment]) -> TrafficRiskContext {
    let mut context = TrafficRiskContext {
        total_segments: segments.len(),
        risk_summary: RiskCounts::tally(segments),
        ..TrafficRiskContext::default()
    };

    for segment in segments {
        let entry = RiskySegment {
            from: segment.leg.origin.clone(),
            to: segment.leg.destination.clone(),
            time: segment.departure_label(),
            risk_cause: segment.risk.cause.clone(),
            duration_in_traffic: None,
        };
        match segment.risk_level() {
            RiskLevel::High => context.high_risk_segments.push(RiskySegment {
                duration_in_traffic: segment.leg.duration_in_traffic_text.clone(),
                ..entry
            }),
            RiskLevel::Medium => context.medium_risk_segments.push(entry),
            RiskLevel::Low => {}
        }
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{compute_schedule, ScheduleConstraints};
    use crate::types::RouteSegment;
    use chrono::NaiveTime;

    #[test]
    fn test_traffic_risk_context_buckets() {
        let segments = vec![
            RouteSegment::new("Hotel", "Plant")
                .with_duration(130 * 60)
                .with_traffic_duration(140 * 60),
            RouteSegment::new("Plant", "Office").with_duration(100 * 60),
            RouteSegment::new("Office", "Hotel").with_duration(10 * 60),
        ];
        let scheduled = compute_schedule(
            &segments,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            &ScheduleConstraints::default(),
        );

        let context = traffic_risk_context(&scheduled);
        assert_eq!(context.total_segments, 3);
        assert_eq!(
            context.risk_summary,
            RiskCounts {
                high: 1,
                medium: 1,
                low: 1
            }
        );
        assert_eq!(context.high_risk_segments[0].from, "Hotel");
        assert_eq!(
            context.high_risk_segments[0].duration_in_traffic.as_deref(),
            Some("140 mins")
        );
        assert!(context.medium_risk_segments[0].duration_in_traffic.is_none());
    }

    #[test]
    fn test_digest_of_fresh_conversation() {
        let conversation = Conversation::new(None);
        let digest = planning_digest(&conversation);
        assert_eq!(digest.stage, PlanningStage::Understanding);
        assert!(digest.requirement.is_none());
        assert!(digest.plan_summary.is_none());
        assert_eq!(digest.planning_log_summary.total_operations, 0);
        assert!(digest.to_prompt_block().contains("understanding"));
    }
}
