use crate::context::TrafficRiskContext;
use crate::routing::BacktrackingIssue;
use crate::types::{DirectionsResult, PlaceCandidate, Plan, ScheduledSegment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered, scheduled route of one plan day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRoute {
    pub day: u32,
    pub theme: String,
    pub order: Vec<String>,
    pub segments: Vec<ScheduledSegment>,
    pub backtracking: Vec<BacktrackingIssue>,
    /// Set when no distance data could be fetched for the day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_error: Option<String>,
}

impl DayRoute {
    pub fn total_distance_meters(&self) -> u64 {
        self.segments.iter().map(|s| s.leg.distance_meters).sum()
    }

    pub fn total_travel_seconds(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| s.leg.effective_duration_seconds())
            .sum()
    }
}

/// Alternative routes fetched for a risky segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeRoutes {
    pub origin: String,
    pub destination: String,
    pub directions: DirectionsResult,
}

/// Everything the report is rendered from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub plan: Plan,
    pub days: Vec<DayRoute>,
    pub risk: TrafficRiskContext,
    pub alternatives: Vec<AlternativeRoutes>,
    pub lodging: Vec<PlaceCandidate>,
    /// Absorbed failures worth showing to the traveller
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl Itinerary {
    pub fn segments(&self) -> impl Iterator<Item = &ScheduledSegment> {
        self.days.iter().flat_map(|d| d.segments.iter())
    }

    pub fn total_distance_km(&self) -> f64 {
        self.days
            .iter()
            .map(DayRoute::total_distance_meters)
            .sum::<u64>() as f64
            / 1000.0
    }

    pub fn total_travel_hours(&self) -> f64 {
        self.days
            .iter()
            .map(DayRoute::total_travel_seconds)
            .sum::<u64>() as f64
            / 3600.0
    }
}
