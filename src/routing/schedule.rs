use super::risk::{assess_risk_with, RiskThresholds, RushHourWindow};
use crate::types::{RouteSegment, ScheduledSegment};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic model requested from the distance provider when a departure time is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficModel {
    BestGuess,
    #[default]
    Pessimistic,
    Optimistic,
}

impl fmt::Display for TrafficModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrafficModel::BestGuess => "best_guess",
            TrafficModel::Pessimistic => "pessimistic",
            TrafficModel::Optimistic => "optimistic",
        })
    }
}

/// Parameters of the day schedule walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConstraints {
    #[serde(with = "crate::types::segment::clock")]
    pub start_time: NaiveTime,
    pub morning_rush: RushHourWindow,
    pub evening_rush: RushHourWindow,
    /// Longest acceptable one-way travel time
    pub max_travel_minutes: u32,
    /// Time spent at a stop when the segment does not say otherwise
    pub default_visit_minutes: u32,
    pub traffic_model: TrafficModel,
    pub thresholds: RiskThresholds,
}

impl Default for ScheduleConstraints {
    fn default() -> Self {
        Self {
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            morning_rush: RushHourWindow::morning(),
            evening_rush: RushHourWindow::evening(),
            max_travel_minutes: 120,
            default_visit_minutes: 60,
            traffic_model: TrafficModel::default(),
            thresholds: RiskThresholds::default(),
        }
    }
}

impl ScheduleConstraints {
    pub fn is_rush_hour(&self, time: NaiveTime) -> bool {
        self.morning_rush.contains(time) || self.evening_rush.contains(time)
    }
}

/// Walk the segments in order from `start_time`, stamping departure/arrival times and risk.
///
/// Arrival is departure plus the base travel time rounded up to whole minutes; the next
/// departure follows after the visit at the destination. Deterministic for equal inputs.
pub fn compute_schedule(
    segments: &[RouteSegment],
    start_time: NaiveTime,
    constraints: &ScheduleConstraints,
) -> Vec<ScheduledSegment> {
    let mut clock = start_time;

    segments
        .iter()
        .map(|segment| {
            let travel_minutes = segment.duration_seconds.div_ceil(60) as i64;
            let visit_minutes = segment
                .visit_minutes
                .unwrap_or(constraints.default_visit_minutes);

            let departure_time = clock;
            let is_rush_hour = constraints.is_rush_hour(departure_time);
            let arrival_time = departure_time + Duration::minutes(travel_minutes);

            let risk = assess_risk_with(
                segment.duration_seconds,
                segment.duration_in_traffic_seconds,
                is_rush_hour,
                constraints.max_travel_minutes,
                &constraints.thresholds,
            );

            clock = arrival_time + Duration::minutes(i64::from(visit_minutes));

            ScheduledSegment {
                leg: segment.clone(),
                departure_time,
                arrival_time,
                visit_minutes,
                is_rush_hour,
                risk,
            }
        })
        .collect()
}
