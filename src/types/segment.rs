use super::maps::{MatrixElement, MatrixEntry};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Travel risk classification of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

/// Outcome of classifying one segment's travel time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub cause: String,
    pub mitigation: String,
    /// Effective travel time in minutes (traffic duration when known)
    pub minutes: f64,
    pub traffic_delay_minutes: f64,
    pub is_rush_hour: bool,
}

/// An unscheduled edge between two consecutive stops, derived from the distance matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub origin: String,
    pub destination: String,
    pub distance_meters: u64,
    pub distance_text: String,
    pub duration_seconds: u64,
    pub duration_text: String,
    pub duration_in_traffic_seconds: Option<u64>,
    pub duration_in_traffic_text: Option<String>,
    /// Time spent at `destination` before moving on; the schedule default applies when unset
    pub visit_minutes: Option<u32>,
    /// Set when the matrix cell for this pair was not OK
    pub unavailable: Option<String>,
}

impl RouteSegment {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            distance_meters: 0,
            distance_text: String::new(),
            duration_seconds: 0,
            duration_text: String::new(),
            duration_in_traffic_seconds: None,
            duration_in_traffic_text: None,
            visit_minutes: None,
            unavailable: None,
        }
    }

    pub fn with_distance(mut self, meters: u64) -> Self {
        self.distance_meters = meters;
        self.distance_text = format!("{:.1} km", meters as f64 / 1000.0);
        self
    }

    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration_seconds = seconds;
        self.duration_text = format!("{} mins", (seconds + 59) / 60);
        self
    }

    pub fn with_traffic_duration(mut self, seconds: u64) -> Self {
        self.duration_in_traffic_seconds = Some(seconds);
        self.duration_in_traffic_text = Some(format!("{} mins", (seconds + 59) / 60));
        self
    }

    pub fn with_visit_minutes(mut self, minutes: u32) -> Self {
        self.visit_minutes = Some(minutes);
        self
    }

    /// Build a segment from a matrix cell. Failed cells keep zero metrics and are marked unavailable.
    pub fn from_entry(entry: &MatrixEntry) -> Self {
        let mut segment = RouteSegment::new(&entry.origin, &entry.destination);
        match &entry.element {
            MatrixElement::Ok(leg) => {
                segment.distance_meters = leg.distance_meters;
                segment.distance_text = leg.distance_text.clone();
                segment.duration_seconds = leg.duration_seconds;
                segment.duration_text = leg.duration_text.clone();
                segment.duration_in_traffic_seconds = leg.duration_in_traffic_seconds;
                segment.duration_in_traffic_text = leg.duration_in_traffic_text.clone();
            }
            MatrixElement::Failed { status, error } => {
                segment.unavailable = Some(format!("{}: {}", status, error));
            }
        }
        segment
    }

    /// Traffic duration if the provider reported one, else the base duration
    pub fn effective_duration_seconds(&self) -> u64 {
        self.duration_in_traffic_seconds
            .filter(|s| *s > 0)
            .unwrap_or(self.duration_seconds)
    }

    pub fn traffic_delay_seconds(&self) -> i64 {
        self.effective_duration_seconds() as i64 - self.duration_seconds as i64
    }
}

/// A segment with clock times and a risk classification attached by the schedule walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSegment {
    #[serde(flatten)]
    pub leg: RouteSegment,
    #[serde(with = "clock")]
    pub departure_time: NaiveTime,
    #[serde(with = "clock")]
    pub arrival_time: NaiveTime,
    pub visit_minutes: u32,
    pub is_rush_hour: bool,
    pub risk: RiskAssessment,
}

impl ScheduledSegment {
    pub fn risk_level(&self) -> RiskLevel {
        self.risk.level
    }

    pub fn departure_label(&self) -> String {
        self.departure_time.format("%H:%M").to_string()
    }

    pub fn arrival_label(&self) -> String {
        self.arrival_time.format("%H:%M").to_string()
    }
}

/// `HH:MM` wire format for clock times
pub(crate) mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::maps::MatrixLeg;

    #[test]
    fn test_effective_duration_falls_back_to_base() {
        let segment = RouteSegment::new("A", "B").with_duration(600);
        assert_eq!(segment.effective_duration_seconds(), 600);
        assert_eq!(segment.traffic_delay_seconds(), 0);

        let zero_traffic = segment.clone().with_traffic_duration(0);
        assert_eq!(zero_traffic.effective_duration_seconds(), 600);

        let slow = segment.with_traffic_duration(900);
        assert_eq!(slow.traffic_delay_seconds(), 300);
    }

    #[test]
    fn test_from_failed_entry() {
        let entry = MatrixEntry {
            origin: "A".to_string(),
            destination: "B".to_string(),
            element: MatrixElement::Failed {
                status: "ZERO_RESULTS".to_string(),
                error: "no route".to_string(),
            },
        };
        let segment = RouteSegment::from_entry(&entry);
        assert_eq!(segment.duration_seconds, 0);
        assert!(segment.unavailable.as_deref().unwrap().contains("ZERO_RESULTS"));
    }

    #[test]
    fn test_from_ok_entry() {
        let entry = MatrixEntry {
            origin: "A".to_string(),
            destination: "B".to_string(),
            element: MatrixElement::Ok(MatrixLeg {
                distance_meters: 12_000,
                distance_text: "12 km".to_string(),
                duration_seconds: 1_800,
                duration_text: "30 mins".to_string(),
                duration_in_traffic_seconds: Some(2_400),
                duration_in_traffic_text: Some("40 mins".to_string()),
            }),
        };
        let segment = RouteSegment::from_entry(&entry);
        assert_eq!(segment.distance_meters, 12_000);
        assert_eq!(segment.effective_duration_seconds(), 2_400);
        assert!(segment.unavailable.is_none());
    }
}
