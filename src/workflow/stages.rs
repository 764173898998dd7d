//! The eight planning stages.
//!
//! Every stage marks itself as running in the [`PlanningState`], appends exactly one entry to
//! the [`PlanningContext`] log and returns an `Err` only for stage-level failures, after
//! recording them. Mutations are append-only, so a failed stage can simply be retried.

use std::collections::HashMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::{
    traffic_risk_context, LogStatus, Operation, PlanningContext, PlanningState, PlanningStatus,
    StateSnapshot, TrafficRiskContext, WorkflowStage,
};
use crate::error::{PlannerError, Result};
use crate::routing::{compute_schedule, detect_backtracking, order_route, BacktrackingIssue, ScheduleConstraints};
use crate::services::maps_client::{DirectionsRequest, MapsProvider, MatrixRequest, PlaceQuery};
use crate::services::report::ReportFormatter;
use crate::types::{
    DirectionsResult, GeocodeResult, MatrixEntry, PlaceCandidate, Requirement, RouteSegment,
    ScheduledSegment,
};
use crate::workflow::itinerary::Itinerary;

/// Result of a successful stage together with the state it left behind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome<T> {
    pub stage: WorkflowStage,
    pub payload: T,
    pub state: StateSnapshot,
}

fn begin(state: &mut PlanningState, stage: WorkflowStage) {
    info!(target: "trip_planner::workflow", "stage {} started", stage);
    state.update_status(PlanningStatus::Running, Some(stage));
}

fn finish<T>(state: &mut PlanningState, stage: WorkflowStage, payload: T) -> StageOutcome<T> {
    state.complete_stage(stage);
    debug!(target: "trip_planner::workflow", "stage {} finished", stage);
    StageOutcome {
        stage,
        payload,
        state: state.snapshot(),
    }
}

/// Record a stage-level failure in the log and the state, then hand the error back
fn fail(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    stage: WorkflowStage,
    operation: Operation,
    error: PlannerError,
) -> PlannerError {
    warn!(target: "trip_planner::workflow", "stage {} failed: {}", stage, error);
    context.record_failure(operation, error.to_string());
    state.add_error(stage.as_str(), error.to_string(), None);
    state.update_status(PlanningStatus::Failed, None);
    error
}

/// Record the understanding attempt. Extraction itself happens in the conversation layer.
pub fn understand_requirements(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    requirement: Option<&Requirement>,
) -> Result<StageOutcome<Requirement>> {
    let stage = WorkflowStage::UnderstandRequirements;
    begin(state, stage);

    match requirement {
        Some(requirement) => {
            context.record_success(Operation::UnderstandRequirements {
                destination: Some(requirement.destination().to_string()),
            });
            Ok(finish(state, stage, requirement.clone()))
        }
        None => Err(fail(
            state,
            context,
            stage,
            Operation::UnderstandRequirements { destination: None },
            PlannerError::Validation("No travel requirement has been extracted yet".to_string()),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub query: String,
    pub result: GeocodeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedLocation {
    pub query: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeBatch {
    pub resolved: Vec<ResolvedLocation>,
    pub failed: Vec<FailedLocation>,
}

impl GeocodeBatch {
    pub fn get(&self, query: &str) -> Option<&GeocodeResult> {
        self.resolved
            .iter()
            .find(|r| r.query == query)
            .map(|r| &r.result)
    }
}

/// Geocode each location through the cache. Locations fail independently; the stage
/// succeeds with whatever subset resolved.
pub async fn geocode_locations(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    maps: &dyn MapsProvider,
    locations: &[String],
) -> Result<StageOutcome<GeocodeBatch>> {
    let stage = WorkflowStage::GeocodeLocations;
    begin(state, stage);

    let mut batch = GeocodeBatch::default();
    for location in locations {
        if let Some(hit) = context.cached_geocode(location) {
            debug!(target: "trip_planner::workflow", "geocode cache hit for {}", location);
            let result = hit.clone();
            state.add_geocode_operation(location, Some(&result));
            batch.resolved.push(ResolvedLocation {
                query: location.clone(),
                result,
            });
            continue;
        }

        match maps.geocode(location).await {
            Ok(result) => {
                context.cache_geocode(location, result.clone());
                state.add_geocode_operation(location, Some(&result));
                batch.resolved.push(ResolvedLocation {
                    query: location.clone(),
                    result,
                });
            }
            Err(err) => {
                warn!(target: "trip_planner::workflow", "geocoding {} failed: {}", location, err);
                state.add_geocode_operation(location, None);
                state.add_error("geocode", err.to_string(), Some(location.clone()));
                batch.failed.push(FailedLocation {
                    query: location.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    state.progress.locations_resolved += batch.resolved.len();
    context.record_success(Operation::Geocode {
        requested: locations.len(),
        resolved: batch.resolved.len(),
        failed: batch.failed.iter().map(|f| f.query.clone()).collect(),
    });
    Ok(finish(state, stage, batch))
}

/// Fetch the full distance/time matrix. A provider failure fails the whole stage.
pub async fn calculate_distances(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    maps: &dyn MapsProvider,
    request: &MatrixRequest,
) -> Result<StageOutcome<Vec<MatrixEntry>>> {
    let stage = WorkflowStage::CalculateDistances;
    begin(state, stage);

    match maps.distance_matrix(request).await {
        Ok(entries) => {
            context.record_success(Operation::DistanceMatrix {
                origins: request.origins.len(),
                destinations: request.destinations.len(),
                cells: entries.len(),
            });
            Ok(finish(state, stage, entries))
        }
        Err(err) => Err(fail(
            state,
            context,
            stage,
            Operation::DistanceMatrix {
                origins: request.origins.len(),
                destinations: request.destinations.len(),
                cells: 0,
            },
            err,
        )),
    }
}

/// Query used for a place type: restaurants and lodging get curated business defaults
pub fn place_query(place_type: &str, location: &str, radius: Option<u32>) -> PlaceQuery {
    let query = match place_type {
        "restaurant" => PlaceQuery::business_restaurants(location),
        "lodging" => PlaceQuery::business_hotels(location),
        other => PlaceQuery::text(format!("{} {}", other, location))
            .near(location, 5_000)
            .with_type(other),
    };
    match radius {
        Some(radius) => query.with_radius(radius),
        None => query,
    }
}

/// Search places of one type near a location, through the cache
pub async fn search_business_places(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    maps: &dyn MapsProvider,
    place_type: &str,
    location: &str,
    radius: Option<u32>,
) -> Result<StageOutcome<Vec<PlaceCandidate>>> {
    let stage = WorkflowStage::SearchBusinessPlaces;
    begin(state, stage);

    let query = place_query(place_type, location, radius);
    let operation = |results: usize, cached: bool| Operation::PlaceSearch {
        place_type: place_type.to_string(),
        location: location.to_string(),
        radius: query.radius,
        results,
        cached,
    };

    if let Some(hit) = context.cached_places(&query) {
        let places = hit.to_vec();
        debug!(target: "trip_planner::workflow", "place cache hit for {} near {}", place_type, location);
        state.add_place_search_operation(&query.query, places.len(), LogStatus::Success);
        context.record_success(operation(places.len(), true));
        return Ok(finish(state, stage, places));
    }

    match maps.search_places(&query).await {
        Ok(places) => {
            context.cache_places(&query, places.clone());
            state.add_place_search_operation(&query.query, places.len(), LogStatus::Success);
            state.progress.places_found += places.len();
            context.record_success(operation(places.len(), false));
            Ok(finish(state, stage, places))
        }
        Err(err) => {
            state.add_place_search_operation(&query.query, 0, LogStatus::Failed);
            let op = operation(0, false);
            Err(fail(state, context, stage, op, err))
        }
    }
}

/// Stops of one day to be ordered and scheduled
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub stops: Vec<String>,
    pub start: String,
    pub end: Option<String>,
    /// Time spent at each stop, by stop name; the schedule default applies otherwise
    pub visit_minutes: HashMap<String, u32>,
    pub start_time: NaiveTime,
}

impl RouteRequest {
    /// Start at the first stop
    pub fn from_stops(stops: Vec<String>, start_time: NaiveTime) -> Self {
        Self {
            start: stops.first().cloned().unwrap_or_default(),
            stops,
            end: None,
            visit_minutes: HashMap::new(),
            start_time,
        }
    }

    pub fn with_visit_minutes(mut self, visit_minutes: HashMap<String, u32>) -> Self {
        self.visit_minutes = visit_minutes;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRoute {
    pub order: Vec<String>,
    pub segments: Vec<ScheduledSegment>,
    pub backtracking: Vec<BacktrackingIssue>,
}

/// Order the stops, rebuild segments from the matrix and schedule them.
///
/// Consecutive pairs without any matrix entry get no segment; failed cells yield a segment
/// marked unavailable.
pub fn optimize_route(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    request: &RouteRequest,
    matrix: &[MatrixEntry],
    constraints: &ScheduleConstraints,
) -> Result<StageOutcome<OptimizedRoute>> {
    let stage = WorkflowStage::OptimizeRoute;
    begin(state, stage);

    let order = order_route(
        &request.stops,
        &request.start,
        request.end.as_deref(),
        matrix,
    );

    let segments: Vec<RouteSegment> = order
        .windows(2)
        .filter_map(|pair| {
            let entry = matrix
                .iter()
                .find(|e| e.origin == pair[0] && e.destination == pair[1])?;
            let mut segment = RouteSegment::from_entry(entry);
            segment.visit_minutes = request.visit_minutes.get(&pair[1]).copied();
            Some(segment)
        })
        .collect();

    let backtracking = detect_backtracking(
        &segments,
        matrix,
        constraints.thresholds.backtracking_ratio,
    );
    let scheduled = compute_schedule(&segments, request.start_time, constraints);

    state.progress.segments_scheduled += scheduled.len();
    context.record_success(Operation::OptimizeRoute {
        stops: order.len(),
        segments: scheduled.len(),
    });

    Ok(finish(
        state,
        stage,
        OptimizedRoute {
            order,
            segments: scheduled,
            backtracking,
        },
    ))
}

/// Bucket scheduled segments by risk level
pub fn assess_traffic_risks(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    segments: &[ScheduledSegment],
) -> Result<StageOutcome<TrafficRiskContext>> {
    let stage = WorkflowStage::AssessTrafficRisks;
    begin(state, stage);

    let risk = traffic_risk_context(segments);
    let counts = risk.risk_summary;
    state.progress.high_risk_segments = counts.high;
    context.record_success(Operation::AssessTrafficRisks {
        high: counts.high,
        medium: counts.medium,
        low: counts.low,
    });
    Ok(finish(state, stage, risk))
}

/// Fetch alternative routes between two points, primary first
pub async fn generate_alternatives(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    maps: &dyn MapsProvider,
    request: &DirectionsRequest,
) -> Result<StageOutcome<DirectionsResult>> {
    let stage = WorkflowStage::GenerateAlternatives;
    begin(state, stage);

    let operation = |routes: usize| Operation::GenerateAlternatives {
        origin: request.origin.clone(),
        destination: request.destination.clone(),
        routes,
    };

    if let Some(hit) = context.cached_directions(request) {
        let result = hit.clone();
        let routes = result.routes().count();
        state.add_directions_operation(&request.origin, &request.destination, routes, LogStatus::Success);
        context.record_success(operation(routes));
        return Ok(finish(state, stage, result));
    }

    match maps.directions(request).await {
        Ok(result) => {
            let routes = result.routes().count();
            context.cache_directions(request, result.clone());
            state.add_directions_operation(&request.origin, &request.destination, routes, LogStatus::Success);
            state.progress.alternatives_found += result.alternatives.len();
            context.record_success(operation(routes));
            Ok(finish(state, stage, result))
        }
        Err(err) => {
            state.add_directions_operation(&request.origin, &request.destination, 0, LogStatus::Failed);
            let op = operation(0);
            Err(fail(state, context, stage, op, err))
        }
    }
}

/// Render the assembled itinerary and mark the workflow completed
pub fn generate_report(
    state: &mut PlanningState,
    context: &mut PlanningContext,
    formatter: &dyn ReportFormatter,
    itinerary: &Itinerary,
) -> Result<StageOutcome<String>> {
    let stage = WorkflowStage::GenerateReport;
    begin(state, stage);

    let markdown = formatter.render(itinerary);
    context.record_success(Operation::GenerateReport {
        length: markdown.len(),
    });
    state.progress.report_ready = true;
    state.update_status(PlanningStatus::Completed, None);
    Ok(finish(state, stage, markdown))
}
