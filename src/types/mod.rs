pub mod maps;
pub mod plan;
pub mod requirement;
pub mod segment;

pub use maps::{
    DirectionsResult, GeocodeResult, MatrixElement, MatrixEntry, MatrixLeg, PlaceCandidate,
    RouteStep, RouteSummary,
};
pub use plan::{DayPlan, Place, Plan, DEFAULT_VISIT_MINUTES};
pub use requirement::{Requirement, RequirementDraft, TravelMode};
pub use segment::{RiskAssessment, RiskLevel, RouteSegment, ScheduledSegment};
