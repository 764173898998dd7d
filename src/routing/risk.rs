use crate::types::{RiskAssessment, RiskLevel};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Tunable cut-offs used when classifying travel risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Share of the travel cap above which a segment is medium risk
    pub near_cap_ratio: f64,
    /// Rush-hour segments longer than this many minutes are medium risk
    pub rush_hour_minutes: f64,
    /// Traffic delays longer than this many minutes are medium risk
    pub traffic_delay_minutes: f64,
    /// Rush-hour causes mention the delay once it exceeds this many minutes
    pub traffic_note_minutes: f64,
    /// Direct/indirect distance ratio below which a leg pair counts as backtracking
    pub backtracking_ratio: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            near_cap_ratio: 0.8,
            rush_hour_minutes: 30.0,
            traffic_delay_minutes: 20.0,
            traffic_note_minutes: 10.0,
            backtracking_ratio: 0.7,
        }
    }
}

/// Inclusive clock-time interval with elevated travel risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RushHourWindow {
    #[serde(with = "crate::types::segment::clock")]
    pub start: NaiveTime,
    #[serde(with = "crate::types::segment::clock")]
    pub end: NaiveTime,
}

impl RushHourWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build a window from two `HH:MM` strings
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = minute_of_day(start)?;
        let end = minute_of_day(end)?;
        Some(Self {
            start: NaiveTime::from_hms_opt(start / 60, start % 60, 0)?,
            end: NaiveTime::from_hms_opt(end / 60, end % 60, 0)?,
        })
    }

    pub fn morning() -> Self {
        Self::hm(7, 0, 9, 0)
    }

    pub fn evening() -> Self {
        Self::hm(16, 30, 18, 30)
    }

    fn hm(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start_h, start_m, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end_h, end_m, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Parse `HH:MM` into minutes since midnight
pub fn minute_of_day(value: &str) -> Option<u32> {
    let (hour, minute) = value.trim().split_once(':')?;
    let hour: u32 = hour.trim().parse().ok()?;
    let minute: u32 = minute.trim().parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}

/// Whether `time` falls inside `[window_start, window_end]`.
///
/// Malformed input yields `false`.
pub fn is_rush_hour(time: &str, window_start: &str, window_end: &str) -> bool {
    match (
        minute_of_day(time),
        minute_of_day(window_start),
        minute_of_day(window_end),
    ) {
        (Some(t), Some(start), Some(end)) => start <= t && t <= end,
        _ => false,
    }
}

/// Classify a segment with the default thresholds
pub fn assess_risk(
    base_duration_seconds: u64,
    traffic_duration_seconds: Option<u64>,
    is_rush_hour: bool,
    max_travel_minutes: u32,
) -> RiskAssessment {
    assess_risk_with(
        base_duration_seconds,
        traffic_duration_seconds,
        is_rush_hour,
        max_travel_minutes,
        &RiskThresholds::default(),
    )
}

/// Classify a segment's travel risk.
///
/// Checks run in priority order: over the cap is high; then near the cap, long rush-hour
/// travel and heavy traffic delay are medium, first match wins; everything else is low.
pub fn assess_risk_with(
    base_duration_seconds: u64,
    traffic_duration_seconds: Option<u64>,
    is_rush_hour: bool,
    max_travel_minutes: u32,
    thresholds: &RiskThresholds,
) -> RiskAssessment {
    let traffic = traffic_duration_seconds.filter(|s| *s > 0);
    let effective_seconds = traffic.unwrap_or(base_duration_seconds) as f64;
    let minutes = effective_seconds / 60.0;
    let max_seconds = f64::from(max_travel_minutes) * 60.0;

    let traffic_delay_minutes = traffic
        .map(|t| (t as f64 - base_duration_seconds as f64) / 60.0)
        .unwrap_or(0.0);
    let traffic_delay_minutes = (traffic_delay_minutes * 10.0).round() / 10.0;

    let (level, cause, mitigation) = if effective_seconds > max_seconds {
        (
            RiskLevel::High,
            format!(
                "One-way travel of {:.1} min exceeds the {} min limit",
                minutes, max_travel_minutes
            ),
            "Depart earlier, choose a closer location or split the trip".to_string(),
        )
    } else if effective_seconds > max_seconds * thresholds.near_cap_ratio {
        (
            RiskLevel::Medium,
            format!(
                "One-way travel of {:.1} min is close to the {} min limit",
                minutes, max_travel_minutes
            ),
            "Keep extra buffer time and avoid peak hours".to_string(),
        )
    } else if is_rush_hour && minutes > thresholds.rush_hour_minutes {
        let mut cause = format!(
            "Rush-hour travel of {:.1} min may delay business meetings",
            minutes
        );
        if traffic_delay_minutes > thresholds.traffic_note_minutes {
            cause.push_str(&format!(
                ", traffic delay about {:.0} min",
                traffic_delay_minutes
            ));
        }
        (
            RiskLevel::Medium,
            cause,
            "Depart before the peak or move the visit to an off-peak slot".to_string(),
        )
    } else if traffic_delay_minutes > thresholds.traffic_delay_minutes {
        (
            RiskLevel::Medium,
            format!("Traffic delay of about {:.0} min", traffic_delay_minutes),
            "Keep a buffer and avoid congested roads".to_string(),
        )
    } else {
        (
            RiskLevel::Low,
            format!("Travel of {:.1} min, low risk", minutes),
            "Proceed as planned".to_string(),
        )
    };

    RiskAssessment {
        level,
        cause,
        mitigation,
        minutes,
        traffic_delay_minutes,
        is_rush_hour,
    }
}
