//! Pure route computations: stop ordering, day schedules and travel risk.
//!
//! Nothing in here performs I/O; the workflow stages feed it data fetched from the
//! maps provider.

pub mod orderer;
pub mod risk;
pub mod schedule;

pub use orderer::{detect_backtracking, order_route, BacktrackingIssue, DistanceLookup};
pub use risk::{
    assess_risk, assess_risk_with, is_rush_hour, minute_of_day, RiskThresholds, RushHourWindow,
};
pub use schedule::{compute_schedule, ScheduleConstraints, TrafficModel};
