//! Map lookups exposed to the language model. Results go through the conversation's
//! planning caches and are counted in its planning state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::names;
use super::tool::{parse_arguments, schema_for, Tool, ToolContext, ToolFuture};
use crate::context::{LogStatus, Operation};
use crate::error::{PlannerError, Result};
use crate::routing::TrafficModel;
use crate::services::maps_client::{DirectionsRequest, MatrixRequest, PlaceQuery};
use crate::types::TravelMode;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GeocodeParams {
    /// Address or place name to resolve
    pub address: String,
}

#[derive(Debug, Default)]
pub struct GeocodeTool;

impl Tool for GeocodeTool {
    fn name(&self) -> &'static str {
        names::GEOCODE
    }

    fn description(&self) -> &'static str {
        "Resolve an address or place name to coordinates and a formatted address"
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<GeocodeParams>()
    }

    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
        Box::pin(async move {
            let params: GeocodeParams = parse_arguments(self.name(), arguments)?;
            let conversation = ctx.conversation;

            let result = match conversation.context.cached_geocode(&params.address) {
                Some(hit) => {
                    debug!(target: "trip_planner::tools", "geocode cache hit for {}", params.address);
                    hit.clone()
                }
                None => match ctx.maps.geocode(&params.address).await {
                    Ok(result) => {
                        conversation.context.cache_geocode(&params.address, result.clone());
                        result
                    }
                    Err(err) => {
                        conversation.planning_state.add_geocode_operation(&params.address, None);
                        conversation.planning_state.add_error(
                            self.name(),
                            err.to_string(),
                            Some(params.address.clone()),
                        );
                        conversation.context.record_failure(
                            Operation::Geocode {
                                requested: 1,
                                resolved: 0,
                                failed: vec![params.address.clone()],
                            },
                            err.to_string(),
                        );
                        return Err(err);
                    }
                },
            };
            conversation
                .planning_state
                .add_geocode_operation(&params.address, Some(&result));
            Ok(serde_json::to_value(result)?)
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchPlacesParams {
    /// Free-text query, e.g. "industrial park Cikarang"
    pub query: String,
    /// Area to search around: "lat,lng" or a place name
    #[serde(default)]
    pub location: Option<String>,
    /// Search radius in meters
    #[serde(default)]
    pub radius: Option<u32>,
    /// Place type filter such as restaurant or lodging
    #[serde(default)]
    pub place_type: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    /// Minimum price level 0-4
    #[serde(default)]
    pub min_price: Option<u8>,
    /// Maximum price level 0-4
    #[serde(default)]
    pub max_price: Option<u8>,
    #[serde(default)]
    pub open_now: Option<bool>,
}

impl SearchPlacesParams {
    fn into_query(self) -> PlaceQuery {
        let mut query = PlaceQuery::text(self.query);
        let radius = self.radius.unwrap_or(query.radius);
        if let Some(location) = self.location {
            query = query.near(location, radius);
        } else if let Some(radius) = self.radius {
            query = query.with_radius(radius);
        }
        if let Some(place_type) = self.place_type {
            query = query.with_type(place_type);
        }
        if let Some(keyword) = self.keyword {
            query = query.with_keyword(keyword);
        }
        query.min_price = self.min_price;
        query.max_price = self.max_price;
        query.open_now = self.open_now.unwrap_or(false);
        query
    }
}

#[derive(Debug, Default)]
pub struct SearchPlacesTool;

impl Tool for SearchPlacesTool {
    fn name(&self) -> &'static str {
        names::SEARCH_PLACES
    }

    fn description(&self) -> &'static str {
        "Search for places such as business districts, industrial parks, restaurants or hotels; results are sorted by rating"
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<SearchPlacesParams>()
    }

    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
        Box::pin(async move {
            let params: SearchPlacesParams = parse_arguments(self.name(), arguments)?;
            let query = params.into_query();
            let conversation = ctx.conversation;

            if let Some(hit) = conversation.context.cached_places(&query) {
                let places = hit.to_vec();
                conversation.planning_state.add_place_search_operation(
                    &query.query,
                    places.len(),
                    LogStatus::Success,
                );
                return Ok(serde_json::to_value(places)?);
            }

            match ctx.maps.search_places(&query).await {
                Ok(places) => {
                    conversation.context.cache_places(&query, places.clone());
                    conversation.planning_state.add_place_search_operation(
                        &query.query,
                        places.len(),
                        LogStatus::Success,
                    );
                    Ok(serde_json::to_value(places)?)
                }
                Err(err) => {
                    conversation.planning_state.add_place_search_operation(
                        &query.query,
                        0,
                        LogStatus::Failed,
                    );
                    conversation.record_error(self.name(), &err);
                    Err(err)
                }
            }
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DistanceMatrixParams {
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    #[serde(default)]
    pub mode: Option<TravelMode>,
    /// "now" or an RFC 3339 timestamp; enables traffic-aware durations
    #[serde(default)]
    pub departure_time: Option<String>,
}

fn parse_departure(value: &str) -> Result<DateTime<Utc>> {
    if value.trim().eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PlannerError::Validation(format!("Invalid departure_time '{}': {}", value, e)))
}

#[derive(Debug, Default)]
pub struct DistanceMatrixTool;

impl Tool for DistanceMatrixTool {
    fn name(&self) -> &'static str {
        names::DISTANCE_MATRIX
    }

    fn description(&self) -> &'static str {
        "Distances and travel times between every origin and destination; failed cells are reported with their status"
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<DistanceMatrixParams>()
    }

    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
        Box::pin(async move {
            let params: DistanceMatrixParams = parse_arguments(self.name(), arguments)?;
            let mut request = MatrixRequest {
                origins: params.origins,
                destinations: params.destinations,
                mode: params.mode.unwrap_or_default(),
                departure_time: None,
                traffic_model: TrafficModel::default(),
            };
            if let Some(departure) = params.departure_time.as_deref() {
                request = request.departing_at(parse_departure(departure)?, TrafficModel::default());
            }

            let entries = ctx.maps.distance_matrix(&request).await?;
            Ok(serde_json::to_value(entries)?)
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DirectionsParams {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub mode: Option<TravelMode>,
    /// Ask for alternative routes as well (default true)
    #[serde(default)]
    pub alternatives: Option<bool>,
}

#[derive(Debug, Default)]
pub struct DirectionsTool;

impl Tool for DirectionsTool {
    fn name(&self) -> &'static str {
        names::DIRECTIONS
    }

    fn description(&self) -> &'static str {
        "Route between two points with distance, duration and turn-by-turn steps, plus alternative routes"
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<DirectionsParams>()
    }

    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
        Box::pin(async move {
            let params: DirectionsParams = parse_arguments(self.name(), arguments)?;
            let mut request = DirectionsRequest::new(
                &params.origin,
                &params.destination,
                params.mode.unwrap_or_default(),
            );
            if params.alternatives.unwrap_or(true) {
                request = request.with_alternatives();
            }
            let conversation = ctx.conversation;

            if let Some(hit) = conversation.context.cached_directions(&request) {
                let result = hit.clone();
                conversation.planning_state.add_directions_operation(
                    &params.origin,
                    &params.destination,
                    result.routes().count(),
                    LogStatus::Success,
                );
                return Ok(serde_json::to_value(result)?);
            }

            match ctx.maps.directions(&request).await {
                Ok(result) => {
                    conversation.context.cache_directions(&request, result.clone());
                    conversation.planning_state.add_directions_operation(
                        &params.origin,
                        &params.destination,
                        result.routes().count(),
                        LogStatus::Success,
                    );
                    Ok(serde_json::to_value(result)?)
                }
                Err(err) => {
                    conversation.planning_state.add_directions_operation(
                        &params.origin,
                        &params.destination,
                        0,
                        LogStatus::Failed,
                    );
                    conversation.record_error(self.name(), &err);
                    Err(err)
                }
            }
        })
    }
}
