use super::planning_context::LogStatus;
use crate::types::GeocodeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanningStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// The eight workflow stages in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    UnderstandRequirements,
    GeocodeLocations,
    CalculateDistances,
    SearchBusinessPlaces,
    OptimizeRoute,
    AssessTrafficRisks,
    GenerateAlternatives,
    GenerateReport,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::UnderstandRequirements => "understand_requirements",
            WorkflowStage::GeocodeLocations => "geocode_locations",
            WorkflowStage::CalculateDistances => "calculate_distances",
            WorkflowStage::SearchBusinessPlaces => "search_business_places",
            WorkflowStage::OptimizeRoute => "optimize_route",
            WorkflowStage::AssessTrafficRisks => "assess_traffic_risks",
            WorkflowStage::GenerateAlternatives => "generate_alternatives",
            WorkflowStage::GenerateReport => "generate_report",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeOperation {
    pub address: String,
    pub formatted_address: Option<String>,
    pub status: LogStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsOperation {
    pub origin: String,
    pub destination: String,
    pub routes: usize,
    pub status: LogStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSearchOperation {
    pub query: String,
    pub results_count: usize,
    pub status: LogStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateError {
    /// Stage or operation that failed
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed_stages: Vec<WorkflowStage>,
    pub locations_resolved: usize,
    pub places_found: usize,
    pub segments_scheduled: usize,
    pub high_risk_segments: usize,
    pub alternatives_found: usize,
    pub report_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateStatistics {
    pub geocode_operations: usize,
    pub directions_operations: usize,
    pub place_search_operations: usize,
    pub errors: usize,
}

/// Serializable progress report of a [`PlanningState`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub conversation_id: String,
    pub status: PlanningStatus,
    pub stage: Option<WorkflowStage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub progress: Progress,
    pub statistics: StateStatistics,
}

/// Execution status of one conversation's planning workflow.
///
/// Updated alongside the planning log but kept separate from it; this is what progress
/// reporting reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningState {
    pub conversation_id: String,
    pub status: PlanningStatus,
    pub stage: Option<WorkflowStage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub geocode_operations: Vec<GeocodeOperation>,
    pub directions_operations: Vec<DirectionsOperation>,
    pub place_search_operations: Vec<PlaceSearchOperation>,
    pub errors: Vec<StateError>,
    pub progress: Progress,
}

impl PlanningState {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            status: PlanningStatus::Pending,
            stage: None,
            created_at: now,
            updated_at: now,
            geocode_operations: Vec::new(),
            directions_operations: Vec::new(),
            place_search_operations: Vec::new(),
            errors: Vec::new(),
            progress: Progress::default(),
        }
    }

    pub fn update_status(&mut self, status: PlanningStatus, stage: Option<WorkflowStage>) {
        self.status = status;
        if stage.is_some() {
            self.stage = stage;
        }
        self.updated_at = Utc::now();
    }

    pub fn complete_stage(&mut self, stage: WorkflowStage) {
        if !self.progress.completed_stages.contains(&stage) {
            self.progress.completed_stages.push(stage);
        }
        self.updated_at = Utc::now();
    }

    pub fn add_geocode_operation(&mut self, address: &str, result: Option<&GeocodeResult>) {
        self.geocode_operations.push(GeocodeOperation {
            address: address.to_string(),
            formatted_address: result.map(|r| r.formatted_address.clone()),
            status: if result.is_some() {
                LogStatus::Success
            } else {
                LogStatus::Failed
            },
            timestamp: Utc::now(),
        });
    }

    pub fn add_directions_operation(
        &mut self,
        origin: &str,
        destination: &str,
        routes: usize,
        status: LogStatus,
    ) {
        self.directions_operations.push(DirectionsOperation {
            origin: origin.to_string(),
            destination: destination.to_string(),
            routes,
            status,
            timestamp: Utc::now(),
        });
    }

    pub fn add_place_search_operation(
        &mut self,
        query: &str,
        results_count: usize,
        status: LogStatus,
    ) {
        self.place_search_operations.push(PlaceSearchOperation {
            query: query.to_string(),
            results_count,
            status,
            timestamp: Utc::now(),
        });
    }

    pub fn add_error(
        &mut self,
        kind: impl Into<String>,
        message: impl Into<String>,
        context: Option<String>,
    ) {
        self.errors.push(StateError {
            kind: kind.into(),
            message: message.into(),
            context,
            timestamp: Utc::now(),
        });
        self.updated_at = Utc::now();
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            conversation_id: self.conversation_id.clone(),
            status: self.status,
            stage: self.stage,
            created_at: self.created_at,
            updated_at: self.updated_at,
            progress: self.progress.clone(),
            statistics: StateStatistics {
                geocode_operations: self.geocode_operations.len(),
                directions_operations: self.directions_operations.len(),
                place_search_operations: self.place_search_operations.len(),
                errors: self.errors.len(),
            },
        }
    }
}
