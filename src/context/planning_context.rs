use crate::services::maps_client::{DirectionsRequest, PlaceQuery};
use crate::types::{DirectionsResult, GeocodeResult, PlaceCandidate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Number of entries kept in a [`LogSummary`]
pub const RECENT_OPERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Failed,
}

/// What a log entry describes. Serialized under the entry's `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    UnderstandRequirements {
        destination: Option<String>,
    },
    Geocode {
        requested: usize,
        resolved: usize,
        failed: Vec<String>,
    },
    DistanceMatrix {
        origins: usize,
        destinations: usize,
        cells: usize,
    },
    PlaceSearch {
        place_type: String,
        location: String,
        radius: u32,
        results: usize,
        cached: bool,
    },
    OptimizeRoute {
        stops: usize,
        segments: usize,
    },
    AssessTrafficRisks {
        high: usize,
        medium: usize,
        low: usize,
    },
    GenerateAlternatives {
        origin: String,
        destination: String,
        routes: usize,
    },
    GenerateReport {
        length: usize,
    },
    /// A conversation-level action such as a tool call, a model turn or execution
    Conversation {
        action: String,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::UnderstandRequirements { .. } => "understand_requirements",
            Operation::Geocode { .. } => "geocode",
            Operation::DistanceMatrix { .. } => "distance_matrix",
            Operation::PlaceSearch { .. } => "place_search",
            Operation::OptimizeRoute { .. } => "optimize_route",
            Operation::AssessTrafficRisks { .. } => "assess_traffic_risks",
            Operation::GenerateAlternatives { .. } => "generate_alternatives",
            Operation::GenerateReport { .. } => "generate_report",
            Operation::Conversation { .. } => "conversation",
        }
    }
}

/// One append-only record of a planning attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningLogEntry {
    pub log_id: String,
    pub status: LogStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentOperation {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: LogStatus,
    pub timestamp: DateTime<Utc>,
}

/// Compact view of the planning log handed to the language model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub recent_operations: Vec<RecentOperation>,
}

/// Per-conversation planning log plus session-scoped lookup caches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningContext {
    log: Vec<PlanningLogEntry>,
    geocode_cache: HashMap<String, GeocodeResult>,
    directions_cache: HashMap<String, DirectionsResult>,
    places_cache: HashMap<String, Vec<PlaceCandidate>>,
}

impl PlanningContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; ids are `log_1`, `log_2`, ... in insertion order
    pub fn record(
        &mut self,
        status: LogStatus,
        operation: Operation,
        error: Option<String>,
    ) -> &PlanningLogEntry {
        let entry = PlanningLogEntry {
            log_id: format!("log_{}", self.log.len() + 1),
            status,
            timestamp: Utc::now(),
            operation,
            error,
        };
        debug!(
            target: "trip_planner::context",
            "{} {} {:?}",
            entry.log_id,
            entry.operation.kind(),
            entry.status
        );
        self.log.push(entry);
        &self.log[self.log.len() - 1]
    }

    pub fn record_success(&mut self, operation: Operation) -> &PlanningLogEntry {
        self.record(LogStatus::Success, operation, None)
    }

    pub fn record_failure(
        &mut self,
        operation: Operation,
        error: impl Into<String>,
    ) -> &PlanningLogEntry {
        self.record(LogStatus::Failed, operation, Some(error.into()))
    }

    pub fn log(&self) -> &[PlanningLogEntry] {
        &self.log
    }

    pub fn last_entry(&self) -> Option<&PlanningLogEntry> {
        self.log.last()
    }

    pub fn summarize(&self) -> LogSummary {
        let successful_operations = self
            .log
            .iter()
            .filter(|e| e.status == LogStatus::Success)
            .count();
        let start = self.log.len().saturating_sub(RECENT_OPERATIONS);

        LogSummary {
            total_operations: self.log.len(),
            successful_operations,
            failed_operations: self.log.len() - successful_operations,
            recent_operations: self.log[start..]
                .iter()
                .map(|e| RecentOperation {
                    kind: e.operation.kind().to_string(),
                    status: e.status,
                    timestamp: e.timestamp,
                })
                .collect(),
        }
    }

    pub fn cached_geocode(&self, address: &str) -> Option<&GeocodeResult> {
        self.geocode_cache.get(&geocode_key(address))
    }

    pub fn cache_geocode(&mut self, address: &str, result: GeocodeResult) {
        self.geocode_cache.insert(geocode_key(address), result);
    }

    pub fn cached_directions(&self, request: &DirectionsRequest) -> Option<&DirectionsResult> {
        self.directions_cache.get(&directions_key(request))
    }

    pub fn cache_directions(&mut self, request: &DirectionsRequest, result: DirectionsResult) {
        self.directions_cache.insert(directions_key(request), result);
    }

    pub fn cached_places(&self, query: &PlaceQuery) -> Option<&[PlaceCandidate]> {
        self.places_cache.get(&places_key(query)).map(Vec::as_slice)
    }

    pub fn cache_places(&mut self, query: &PlaceQuery, results: Vec<PlaceCandidate>) {
        self.places_cache.insert(places_key(query), results);
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn geocode_key(address: &str) -> String {
    normalize(address)
}

/// `origin|destination|mode|alternatives`. A request without alternatives never
/// answers one that asks for them.
pub fn directions_key(request: &DirectionsRequest) -> String {
    format!(
        "{}|{}|{}|{}",
        normalize(&request.origin),
        normalize(&request.destination),
        request.mode.as_str(),
        if request.alternatives { "alt" } else { "single" }
    )
}

/// Every field of the query that changes what the provider returns
pub fn places_key(query: &PlaceQuery) -> String {
    let price = |p: Option<u8>| p.map(|p| p.to_string()).unwrap_or_default();
    format!(
        "{}|{}|{}|{}|{}|{}-{}|{}",
        normalize(query.place_type.as_deref().unwrap_or_default()),
        normalize(&query.query),
        normalize(query.location.as_deref().unwrap_or_default()),
        query.radius,
        normalize(query.keyword.as_deref().unwrap_or_default()),
        price(query.min_price),
        price(query.max_price),
        query.open_now
    )
}
