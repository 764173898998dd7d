use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::{PlanningContext, PlanningState, StateSnapshot};
use crate::error::Result;
use crate::routing::ScheduleConstraints;
use crate::services::maps_client::{DirectionsRequest, MapsProvider, MatrixRequest};
use crate::services::report::{MarkdownReportFormatter, ReportFormatter};
use crate::types::{MatrixEntry, Plan, RiskLevel, ScheduledSegment};
use crate::workflow::itinerary::{AlternativeRoutes, DayRoute, Itinerary};
use crate::workflow::stages::{
    assess_traffic_risks, calculate_distances, generate_alternatives, generate_report,
    geocode_locations, optimize_route, search_business_places, understand_requirements,
    RouteRequest,
};

/// High-risk segments that get alternative routes looked up
pub const MAX_ALTERNATIVE_LOOKUPS: usize = 3;
/// Hotels kept in the itinerary
pub const MAX_LODGING_SUGGESTIONS: usize = 3;

/// Outcome of executing a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub plan_id: String,
    pub version: u32,
    pub markdown: String,
    pub itinerary: Itinerary,
    pub state: StateSnapshot,
}

/// Runs the eight stages over a confirmed plan
#[derive(Clone)]
pub struct ItineraryPipeline {
    maps: Arc<dyn MapsProvider>,
    formatter: Arc<dyn ReportFormatter>,
    constraints: ScheduleConstraints,
}

impl ItineraryPipeline {
    pub fn new(maps: Arc<dyn MapsProvider>) -> Self {
        Self {
            maps,
            formatter: Arc::new(MarkdownReportFormatter::new()),
            constraints: ScheduleConstraints::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ReportFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_constraints(mut self, constraints: ScheduleConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn constraints(&self) -> &ScheduleConstraints {
        &self.constraints
    }

    pub async fn run(
        &self,
        plan: &Plan,
        state: &mut PlanningState,
        context: &mut PlanningContext,
    ) -> Result<ExecutionReport> {
        info!(
            target: "trip_planner::workflow",
            "executing plan {} v{} ({} days)",
            plan.id,
            plan.version,
            plan.days.len()
        );
        let maps = self.maps.as_ref();
        let requirement = &plan.requirement;
        let mode = requirement.transportation_mode();
        let mut warnings = Vec::new();

        understand_requirements(state, context, Some(requirement))?;

        let day_labels = stop_labels(plan);
        let day_stops: Vec<Vec<String>> = day_labels.iter().cloned().map(unique).collect();
        let locations = unique(
            std::iter::once(requirement.destination().to_string())
                .chain(day_stops.iter().flatten().cloned()),
        );

        let geocoded = geocode_locations(state, context, maps, &locations).await?.payload;
        for failure in &geocoded.failed {
            warnings.push(format!("Could not geocode {}: {}", failure.query, failure.error));
        }

        let departure = next_departure(&Local::now(), self.constraints.start_time);

        let mut matrices: Vec<(Vec<MatrixEntry>, Option<String>)> = Vec::new();
        for (day, stops) in plan.days.iter().zip(&day_stops) {
            if stops.len() < 2 {
                matrices.push((Vec::new(), None));
                continue;
            }
            let request = MatrixRequest::square(stops.clone(), mode)
                .departing_at(departure, self.constraints.traffic_model);
            match calculate_distances(state, context, maps, &request).await {
                Ok(outcome) => matrices.push((outcome.payload, None)),
                Err(err) => {
                    warn!(target: "trip_planner::workflow", "day {} has no distance data: {}", day.day, err);
                    warnings.push(format!("Day {}: travel times unavailable ({})", day.day, err));
                    matrices.push((Vec::new(), Some(err.to_string())));
                }
            }
        }

        let lodging_location = geocoded
            .get(requirement.destination())
            .map(|g| g.coordinates())
            .unwrap_or_else(|| requirement.destination().to_string());
        let lodging = match search_business_places(state, context, maps, "lodging", &lodging_location, None).await {
            Ok(outcome) => outcome
                .payload
                .into_iter()
                .take(MAX_LODGING_SUGGESTIONS)
                .collect(),
            Err(err) => {
                warnings.push(format!("Lodging search failed: {}", err));
                Vec::new()
            }
        };

        let mut days = Vec::with_capacity(plan.days.len());
        for (((day, labels), stops), (matrix, matrix_error)) in plan
            .days
            .iter()
            .zip(&day_labels)
            .zip(day_stops)
            .zip(matrices)
        {
            let mut visit_minutes: HashMap<String, u32> = HashMap::new();
            for (label, place) in labels.iter().zip(day.places()) {
                visit_minutes
                    .entry(label.clone())
                    .or_insert(place.estimated_duration);
            }
            let request = RouteRequest::from_stops(stops, self.constraints.start_time)
                .with_visit_minutes(visit_minutes);
            let route = optimize_route(state, context, &request, &matrix, &self.constraints)?.payload;

            days.push(DayRoute {
                day: day.day,
                theme: day.theme.clone(),
                order: route.order,
                segments: route.segments,
                backtracking: route.backtracking,
                matrix_error,
            });
        }

        let all_segments: Vec<ScheduledSegment> =
            days.iter().flat_map(|d| d.segments.iter().cloned()).collect();
        let risk = assess_traffic_risks(state, context, &all_segments)?.payload;

        let mut alternatives = Vec::new();
        for segment in all_segments
            .iter()
            .filter(|s| s.risk_level() == RiskLevel::High)
            .take(MAX_ALTERNATIVE_LOOKUPS)
        {
            let request = DirectionsRequest::new(&segment.leg.origin, &segment.leg.destination, mode)
                .with_alternatives()
                .departing_at(departure, self.constraints.traffic_model);
            match generate_alternatives(state, context, maps, &request).await {
                Ok(outcome) => alternatives.push(AlternativeRoutes {
                    origin: request.origin,
                    destination: request.destination,
                    directions: outcome.payload,
                }),
                Err(err) => warnings.push(format!(
                    "No alternative routes for {} → {}: {}",
                    request.origin, request.destination, err
                )),
            }
        }

        let itinerary = Itinerary {
            plan: plan.clone(),
            days,
            risk,
            alternatives,
            lodging,
            warnings,
            generated_at: Utc::now(),
        };
        let report = generate_report(state, context, self.formatter.as_ref(), &itinerary)?;

        info!(
            target: "trip_planner::workflow",
            "plan {} executed: {} segments, {} high risk",
            plan.id,
            itinerary.risk.total_segments,
            itinerary.risk.risk_summary.high
        );

        Ok(ExecutionReport {
            plan_id: plan.id.clone(),
            version: plan.version,
            markdown: report.payload,
            itinerary,
            state: report.state,
        })
    }
}

/// Tomorrow at `start` on the wall clock of `now`'s time zone. Traffic-aware lookups use
/// this so rush-hour windows line up with local time.
fn next_departure<Tz: TimeZone>(now: &DateTime<Tz>, start: NaiveTime) -> DateTime<Utc> {
    let tomorrow = (now.clone() + Duration::days(1)).date_naive().and_time(start);
    now.timezone()
        .from_local_datetime(&tomorrow)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&tomorrow))
}

/// Maps-facing label of every place, per day and in plan order. Places that share an
/// address with a differently named place are labelled by name as well.
fn stop_labels(plan: &Plan) -> Vec<Vec<String>> {
    let mut names_by_key: HashMap<&str, HashSet<&str>> = HashMap::new();
    for place in plan.days.iter().flat_map(|d| d.places()) {
        names_by_key
            .entry(place.lookup_key())
            .or_default()
            .insert(place.name.trim());
    }
    plan.days
        .iter()
        .map(|day| {
            day.places()
                .iter()
                .map(|place| match names_by_key.get(place.lookup_key()) {
                    Some(names) if names.len() > 1 => place.qualified_label(),
                    _ => place.lookup_key().to_string(),
                })
                .collect()
        })
        .collect()
}

/// Keep the first occurrence of every value, dropping blanks
fn unique(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !value.trim().is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
