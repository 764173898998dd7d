//! Stage functions that turn a confirmed plan into a scheduled, risk-annotated itinerary.

pub mod itinerary;
pub mod pipeline;
pub mod stages;

pub use itinerary::{AlternativeRoutes, DayRoute, Itinerary};
pub use pipeline::{ExecutionReport, ItineraryPipeline};
pub use stages::{
    assess_traffic_risks, calculate_distances, generate_alternatives, generate_report,
    geocode_locations, optimize_route, place_query, search_business_places,
    understand_requirements, FailedLocation, GeocodeBatch, OptimizedRoute, ResolvedLocation,
    RouteRequest, StageOutcome,
};
