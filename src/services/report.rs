use std::fmt::Write;

use crate::types::{RiskLevel, ScheduledSegment};
use crate::workflow::itinerary::{DayRoute, Itinerary};

/// Renders a finished itinerary for people
pub trait ReportFormatter: Send + Sync {
    fn render(&self, itinerary: &Itinerary) -> String;
}

/// Markdown report with a schedule table per day and a risk summary
#[derive(Debug, Clone, Default)]
pub struct MarkdownReportFormatter;

impl MarkdownReportFormatter {
    pub fn new() -> Self {
        Self
    }

    fn executive_summary(&self, out: &mut String, itinerary: &Itinerary) {
        let requirement = &itinerary.plan.requirement;
        let _ = writeln!(out, "## Executive summary\n");
        let _ = writeln!(out, "- **Days**: {}", requirement.duration_days());
        let _ = writeln!(out, "- **Group size**: {}", requirement.group_size());
        let _ = writeln!(
            out,
            "- **Transportation**: {}",
            requirement.transportation_mode().label()
        );
        let _ = writeln!(
            out,
            "- **Total distance**: {:.1} km",
            itinerary.total_distance_km()
        );
        let _ = writeln!(
            out,
            "- **Total travel time**: {:.1} h (excluding visits)",
            itinerary.total_travel_hours()
        );
        if let Some(budget) = requirement.budget() {
            let _ = writeln!(out, "- **Budget**: {}", budget);
        }
        if !itinerary.plan.overall_summary.is_empty() {
            let _ = writeln!(out, "\n{}", itinerary.plan.overall_summary);
        }
        out.push('\n');
    }

    fn day_section(&self, out: &mut String, itinerary: &Itinerary, route: &DayRoute) {
        let _ = writeln!(out, "## Day {}: {}\n", route.day, route.theme);

        if let Some(day) = itinerary.plan.days.iter().find(|d| d.day == route.day) {
            for place in day.places() {
                let _ = writeln!(
                    out,
                    "- **{}** ({} min): {}",
                    place.name, place.estimated_duration, place.description
                );
            }
            out.push('\n');
        }

        if let Some(error) = &route.matrix_error {
            let _ = writeln!(out, "> Travel times unavailable: {}\n", error);
        }

        if !route.segments.is_empty() {
            let _ = writeln!(
                out,
                "| Depart | Arrive | Route | Distance | Travel time | Risk |"
            );
            let _ = writeln!(out, "|---|---|---|---|---|---|");
            for segment in &route.segments {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} → {} | {} | {} | {} |",
                    segment.departure_label(),
                    segment.arrival_label(),
                    segment.leg.origin,
                    segment.leg.destination,
                    display_or_dash(&segment.leg.distance_text),
                    travel_time(segment),
                    risk_badge(segment.risk_level()),
                );
            }
            out.push('\n');
        }

        for issue in &route.backtracking {
            let _ = writeln!(out, "- ⚠️ {} {}", issue.issue, issue.suggestion);
        }
        if !route.backtracking.is_empty() {
            out.push('\n');
        }
    }

    fn risk_section(&self, out: &mut String, itinerary: &Itinerary) {
        let counts = itinerary.risk.risk_summary;
        let _ = writeln!(out, "## Traffic risk summary\n");
        let _ = writeln!(
            out,
            "{} segments: {} high, {} medium, {} low\n",
            itinerary.risk.total_segments, counts.high, counts.medium, counts.low
        );

        let risky: Vec<&ScheduledSegment> = itinerary
            .segments()
            .filter(|s| s.risk_level() > RiskLevel::Low)
            .collect();
        for segment in risky {
            let _ = writeln!(
                out,
                "- **{} → {}** at {} ({})\n  - Cause: {}\n  - Mitigation: {}",
                segment.leg.origin,
                segment.leg.destination,
                segment.departure_label(),
                segment.risk_level(),
                segment.risk.cause,
                segment.risk.mitigation
            );
        }
        out.push('\n');
    }
}

impl ReportFormatter for MarkdownReportFormatter {
    fn render(&self, itinerary: &Itinerary) -> String {
        let mut out = String::new();
        let plan = &itinerary.plan;

        let _ = writeln!(out, "# {}\n", plan.title);
        let _ = writeln!(
            out,
            "**Generated**: {} · **Version**: {}\n",
            itinerary.generated_at.format("%Y-%m-%d %H:%M UTC"),
            plan.version
        );

        self.executive_summary(&mut out, itinerary);

        for route in &itinerary.days {
            self.day_section(&mut out, itinerary, route);
        }

        self.risk_section(&mut out, itinerary);

        if !itinerary.alternatives.is_empty() {
            let _ = writeln!(out, "## Alternative routes\n");
            for alternative in &itinerary.alternatives {
                let _ = writeln!(
                    out,
                    "### {} → {}\n",
                    alternative.origin, alternative.destination
                );
                for (index, route) in alternative.directions.routes().enumerate() {
                    let label = if index == 0 { "Primary" } else { "Alternative" };
                    let _ = writeln!(
                        out,
                        "{}. {} via {}: {}, {}",
                        index + 1,
                        label,
                        display_or_dash(&route.summary),
                        route.distance_text,
                        route
                            .duration_in_traffic_text
                            .as_deref()
                            .unwrap_or(&route.duration_text)
                    );
                }
                out.push('\n');
            }
        }

        if !itinerary.lodging.is_empty() {
            let _ = writeln!(out, "## Lodging suggestions\n");
            for hotel in &itinerary.lodging {
                match hotel.rating {
                    Some(rating) => {
                        let _ = writeln!(out, "- **{}** ({:.1}★): {}", hotel.name, rating, hotel.address);
                    }
                    None => {
                        let _ = writeln!(out, "- **{}**: {}", hotel.name, hotel.address);
                    }
                }
            }
            out.push('\n');
        }

        let notes: Vec<&String> = plan
            .important_notes
            .iter()
            .chain(itinerary.warnings.iter())
            .collect();
        if !notes.is_empty() {
            let _ = writeln!(out, "## Important notes\n");
            for note in notes {
                let _ = writeln!(out, "- {}", note);
            }
        }

        out
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

fn travel_time(segment: &ScheduledSegment) -> String {
    if segment.leg.unavailable.is_some() {
        return "unavailable".to_string();
    }
    match &segment.leg.duration_in_traffic_text {
        Some(traffic) if traffic != &segment.leg.duration_text => {
            format!("{} ({} in traffic)", segment.leg.duration_text, traffic)
        }
        _ => display_or_dash(&segment.leg.duration_text).to_string(),
    }
}

fn risk_badge(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "🔴 high",
        RiskLevel::Medium => "🟡 medium",
        RiskLevel::Low => "🟢 low",
    }
}
