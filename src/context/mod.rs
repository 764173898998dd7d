//! Per-conversation planning log, lookup caches and workflow state.

pub mod extractor;
pub mod planning_context;
pub mod planning_state;

pub use extractor::{
    planning_digest, traffic_risk_context, PlanDigest, PlanningDigest, RequirementDigest,
    RiskCounts, RiskySegment, TrafficRiskContext,
};
pub use planning_context::{
    LogStatus, LogSummary, Operation, PlanningContext, PlanningLogEntry, RecentOperation,
};
pub use planning_state::{
    PlanningState, PlanningStatus, Progress, StateError, StateSnapshot, WorkflowStage,
};
