use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PlannerError, Result};
use crate::routing::TrafficModel;
use crate::types::{
    DirectionsResult, GeocodeResult, MatrixEntry, MatrixLeg, PlaceCandidate, RouteStep,
    RouteSummary, TravelMode,
};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const SERVICE: &str = "maps";

/// Most place results returned by one search
pub const MAX_PLACE_RESULTS: usize = 10;
/// Most steps kept per route
pub const MAX_ROUTE_STEPS: usize = 10;

/// Place search parameters. With a `location` the search is a nearby search around it,
/// otherwise a free-text search on `query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceQuery {
    pub query: String,
    pub location: Option<String>,
    pub radius: u32,
    pub place_type: Option<String>,
    pub keyword: Option<String>,
    pub min_price: Option<u8>,
    pub max_price: Option<u8>,
    pub open_now: bool,
}

impl PlaceQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: None,
            radius: 5_000,
            place_type: None,
            keyword: None,
            min_price: None,
            max_price: None,
            open_now: false,
        }
    }

    pub fn near(mut self, location: impl Into<String>, radius: u32) -> Self {
        self.location = Some(location.into());
        self.radius = radius;
        self
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_type(mut self, place_type: impl Into<String>) -> Self {
        self.place_type = Some(place_type.into());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_min_price(mut self, min_price: u8) -> Self {
        self.min_price = Some(min_price);
        self
    }

    /// Mid to high-end restaurants suited to business meals
    pub fn business_restaurants(location: &str) -> Self {
        Self::text(format!("business restaurant {}", location))
            .near(location, 1_000)
            .with_type("restaurant")
            .with_keyword("business lunch")
            .with_min_price(2)
    }

    /// Mid to high-end hotels
    pub fn business_hotels(location: &str) -> Self {
        Self::text(format!("business hotel {}", location))
            .near(location, 3_000)
            .with_type("lodging")
            .with_min_price(2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRequest {
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    pub mode: TravelMode,
    /// Enables traffic-aware durations
    pub departure_time: Option<DateTime<Utc>>,
    pub traffic_model: TrafficModel,
}

impl MatrixRequest {
    /// Every location against every other
    pub fn square(locations: Vec<String>, mode: TravelMode) -> Self {
        Self {
            origins: locations.clone(),
            destinations: locations,
            mode,
            departure_time: None,
            traffic_model: TrafficModel::default(),
        }
    }

    pub fn departing_at(mut self, departure: DateTime<Utc>, model: TrafficModel) -> Self {
        self.departure_time = Some(departure);
        self.traffic_model = model;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub origin: String,
    pub destination: String,
    pub mode: TravelMode,
    pub departure_time: Option<DateTime<Utc>>,
    pub traffic_model: TrafficModel,
    pub alternatives: bool,
}

impl DirectionsRequest {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, mode: TravelMode) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            mode,
            departure_time: None,
            traffic_model: TrafficModel::default(),
            alternatives: false,
        }
    }

    pub fn with_alternatives(mut self) -> Self {
        self.alternatives = true;
        self
    }

    pub fn departing_at(mut self, departure: DateTime<Utc>, model: TrafficModel) -> Self {
        self.departure_time = Some(departure);
        self.traffic_model = model;
        self
    }
}

/// Mapping collaborator used by the workflow stages and tools
#[async_trait]
pub trait MapsProvider: Send + Sync {
    /// Resolve an address; errors when nothing matches
    async fn geocode(&self, address: &str) -> Result<GeocodeResult>;

    /// At most [`MAX_PLACE_RESULTS`] places, best rated first
    async fn search_places(&self, query: &PlaceQuery) -> Result<Vec<PlaceCandidate>>;

    /// One entry per origin/destination cell. Cells that failed are kept with their
    /// status; the call itself fails when no cell is OK.
    async fn distance_matrix(&self, request: &MatrixRequest) -> Result<Vec<MatrixEntry>>;

    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResult>;
}

/// [`MapsProvider`] backed by the Google Maps web services
#[derive(Clone, Debug)]
pub struct GoogleMapsClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GoogleMapsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlannerError::Config(format!("Failed to build HTTP client: {err}")))?;
        Ok(self)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}/json", self.base_url, endpoint);
        debug!(target: "trip_planner::maps", "GET {} {:?}", endpoint, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PlannerError::Timeout(format!("{endpoint} request timed out"))
                } else {
                    PlannerError::collaborator(SERVICE, format!("{endpoint} request failed: {err}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            PlannerError::collaborator(SERVICE, format!("Failed to read {endpoint} response: {err}"))
        })?;

        if !status.is_success() {
            return Err(PlannerError::collaborator(
                SERVICE,
                format!("{endpoint} returned HTTP {status}"),
            ));
        }

        let mut deserializer = serde_json::Deserializer::from_str(&body);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            PlannerError::collaborator(
                SERVICE,
                format!("Malformed {endpoint} response at {}: {}", err.path(), err.inner()),
            )
        })
    }
}

fn api_failure(endpoint: &str, status: &str, message: Option<String>) -> PlannerError {
    PlannerError::collaborator(
        SERVICE,
        match message {
            Some(message) => format!("{endpoint} status {status}: {message}"),
            None => format!("{endpoint} status {status}"),
        },
    )
}

#[async_trait]
impl MapsProvider for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult> {
        let response: wire::GeocodeResponse =
            self.get("geocode", &[("address", address.to_string())]).await?;

        if response.status != "OK" && response.status != "ZERO_RESULTS" {
            return Err(api_failure("geocode", &response.status, response.error_message));
        }

        let hit = response.results.into_iter().next().ok_or_else(|| {
            PlannerError::collaborator(SERVICE, format!("No geocoding match for '{address}'"))
        })?;

        Ok(GeocodeResult {
            formatted_address: hit.formatted_address,
            lat: hit.geometry.location.lat,
            lng: hit.geometry.location.lng,
            place_id: hit.place_id,
        })
    }

    async fn search_places(&self, query: &PlaceQuery) -> Result<Vec<PlaceCandidate>> {
        let mut params: Vec<(&str, String)> = Vec::new();

        let endpoint = match &query.location {
            Some(location) => {
                let coordinates = if location.contains(',') {
                    location.clone()
                } else {
                    self.geocode(location).await?.coordinates()
                };
                params.push(("location", coordinates));
                params.push(("radius", query.radius.to_string()));
                if let Some(min_price) = query.min_price {
                    params.push(("minprice", min_price.to_string()));
                }
                if let Some(max_price) = query.max_price {
                    params.push(("maxprice", max_price.to_string()));
                }
                if query.open_now {
                    params.push(("opennow", "true".to_string()));
                }
                "place/nearbysearch"
            }
            None => {
                params.push(("query", query.query.clone()));
                params.push(("radius", query.radius.to_string()));
                "place/textsearch"
            }
        };
        if let Some(place_type) = &query.place_type {
            params.push(("type", place_type.clone()));
        }
        if let Some(keyword) = &query.keyword {
            params.push(("keyword", keyword.clone()));
        }

        let response: wire::PlacesResponse = self.get(endpoint, &params).await?;
        if response.status != "OK" && response.status != "ZERO_RESULTS" {
            return Err(api_failure(endpoint, &response.status, response.error_message));
        }

        let mut places: Vec<PlaceCandidate> = response
            .results
            .into_iter()
            .take(MAX_PLACE_RESULTS)
            .map(wire::PlaceHit::into_candidate)
            .collect();
        places.sort_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .total_cmp(&a.rating.unwrap_or(0.0))
        });
        Ok(places)
    }

    async fn distance_matrix(&self, request: &MatrixRequest) -> Result<Vec<MatrixEntry>> {
        let origins: Vec<&String> = request
            .origins
            .iter()
            .filter(|o| !o.trim().is_empty())
            .collect();
        let destinations: Vec<&String> = request
            .destinations
            .iter()
            .filter(|d| !d.trim().is_empty())
            .collect();
        if origins.is_empty() || destinations.is_empty() {
            return Err(PlannerError::Validation(format!(
                "Distance matrix needs at least one origin and one destination (got {} and {})",
                origins.len(),
                destinations.len()
            )));
        }

        let join = |values: &[&String]| {
            values
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("|")
        };
        let mut params = vec![
            ("origins", join(&origins)),
            ("destinations", join(&destinations)),
            ("mode", request.mode.as_str().to_string()),
        ];
        if let Some(departure) = request.departure_time {
            params.push(("departure_time", departure.timestamp().to_string()));
            params.push(("traffic_model", request.traffic_model.to_string()));
        }

        let response: wire::MatrixResponse = self.get("distancematrix", &params).await?;
        if response.status != "OK" {
            return Err(api_failure(
                "distancematrix",
                &response.status,
                response.error_message,
            ));
        }

        let mut entries = Vec::with_capacity(origins.len() * destinations.len());
        for (origin, row) in origins.iter().zip(response.rows) {
            for (destination, cell) in destinations.iter().zip(row.elements) {
                entries.push(cell.into_entry(origin, destination));
            }
        }

        if !entries.iter().any(MatrixEntry::is_ok) {
            return Err(PlannerError::collaborator(
                SERVICE,
                format!(
                    "No valid distance matrix results for {} origins and {} destinations",
                    origins.len(),
                    destinations.len()
                ),
            ));
        }

        let failed = entries.iter().filter(|e| !e.is_ok()).count();
        if failed > 0 {
            warn!(target: "trip_planner::maps", "{} matrix cells failed", failed);
        }
        Ok(entries)
    }

    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResult> {
        let mut params = vec![
            ("origin", request.origin.clone()),
            ("destination", request.destination.clone()),
            ("mode", request.mode.as_str().to_string()),
        ];
        if let Some(departure) = request.departure_time {
            params.push(("departure_time", departure.timestamp().to_string()));
            params.push(("traffic_model", request.traffic_model.to_string()));
        }
        if request.alternatives {
            params.push(("alternatives", "true".to_string()));
        }

        let response: wire::DirectionsResponse = self.get("directions", &params).await?;
        if response.status != "OK" && response.status != "ZERO_RESULTS" {
            return Err(api_failure("directions", &response.status, response.error_message));
        }

        let mut routes = response.routes.into_iter().filter_map(wire::RouteHit::into_summary);
        let primary = routes.next().ok_or_else(|| {
            PlannerError::collaborator(
                SERVICE,
                format!(
                    "No route found from {} to {}",
                    request.origin, request.destination
                ),
            )
        })?;

        Ok(DirectionsResult {
            primary,
            alternatives: routes.collect(),
        })
    }
}

/// Google Maps JSON payloads
mod wire {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct LatLng {
        pub lat: f64,
        pub lng: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Geometry {
        pub location: LatLng,
    }

    #[derive(Debug, Deserialize)]
    pub struct TextValue {
        pub text: String,
        pub value: u64,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodeResponse {
        pub status: String,
        #[serde(default)]
        pub results: Vec<GeocodeHit>,
        pub error_message: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodeHit {
        pub formatted_address: String,
        pub geometry: Geometry,
        pub place_id: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct PlacesResponse {
        pub status: String,
        #[serde(default)]
        pub results: Vec<PlaceHit>,
        pub error_message: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct PlaceHit {
        pub name: String,
        pub formatted_address: Option<String>,
        pub vicinity: Option<String>,
        pub geometry: Option<Geometry>,
        pub place_id: Option<String>,
        pub rating: Option<f64>,
        #[serde(default)]
        pub user_ratings_total: u32,
        pub price_level: Option<u8>,
        #[serde(default)]
        pub types: Vec<String>,
        pub business_status: Option<String>,
    }

    impl PlaceHit {
        pub fn into_candidate(self) -> PlaceCandidate {
            PlaceCandidate {
                name: self.name,
                address: self
                    .formatted_address
                    .or(self.vicinity)
                    .unwrap_or_default(),
                lat: self.geometry.as_ref().map(|g| g.location.lat),
                lng: self.geometry.as_ref().map(|g| g.location.lng),
                place_id: self.place_id,
                rating: self.rating,
                user_ratings_total: self.user_ratings_total,
                price_level: self.price_level,
                types: self.types,
                business_status: Some(
                    self.business_status
                        .unwrap_or_else(|| "OPERATIONAL".to_string()),
                ),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct MatrixResponse {
        pub status: String,
        #[serde(default)]
        pub rows: Vec<MatrixRow>,
        pub error_message: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MatrixRow {
        #[serde(default)]
        pub elements: Vec<MatrixCell>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MatrixCell {
        pub status: String,
        pub distance: Option<TextValue>,
        pub duration: Option<TextValue>,
        pub duration_in_traffic: Option<TextValue>,
        pub error_message: Option<String>,
    }

    impl MatrixCell {
        pub fn into_entry(self, origin: &str, destination: &str) -> MatrixEntry {
            match (self.status.as_str(), self.distance, self.duration) {
                ("OK", Some(distance), Some(duration)) => MatrixEntry::ok(
                    origin,
                    destination,
                    MatrixLeg {
                        distance_meters: distance.value,
                        distance_text: distance.text,
                        duration_seconds: duration.value,
                        duration_text: duration.text,
                        duration_in_traffic_seconds: self
                            .duration_in_traffic
                            .as_ref()
                            .map(|t| t.value),
                        duration_in_traffic_text: self.duration_in_traffic.map(|t| t.text),
                    },
                ),
                (status, _, _) => {
                    let message = self
                        .error_message
                        .unwrap_or_else(|| format!("Status: {status}"));
                    MatrixEntry::failed(
                        origin,
                        destination,
                        status,
                        format!("Failed to calculate distance: {message}"),
                    )
                }
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct DirectionsResponse {
        pub status: String,
        #[serde(default)]
        pub routes: Vec<RouteHit>,
        pub error_message: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RouteHit {
        #[serde(default)]
        pub summary: String,
        #[serde(default)]
        pub legs: Vec<LegHit>,
    }

    #[derive(Debug, Deserialize)]
    pub struct LegHit {
        pub start_address: String,
        pub end_address: String,
        pub distance: TextValue,
        pub duration: TextValue,
        pub duration_in_traffic: Option<TextValue>,
        #[serde(default)]
        pub steps: Vec<StepHit>,
    }

    #[derive(Debug, Deserialize)]
    pub struct StepHit {
        pub html_instructions: String,
        pub distance: TextValue,
        pub duration: TextValue,
    }

    impl RouteHit {
        pub fn into_summary(self) -> Option<RouteSummary> {
            let leg = self.legs.into_iter().next()?;
            Some(RouteSummary {
                origin: leg.start_address,
                destination: leg.end_address,
                distance_meters: leg.distance.value,
                distance_text: leg.distance.text,
                duration_seconds: leg.duration.value,
                duration_text: leg.duration.text,
                duration_in_traffic_seconds: leg.duration_in_traffic.as_ref().map(|t| t.value),
                duration_in_traffic_text: leg.duration_in_traffic.map(|t| t.text),
                summary: self.summary,
                steps: leg
                    .steps
                    .into_iter()
                    .take(MAX_ROUTE_STEPS)
                    .map(|step| RouteStep {
                        instruction: step.html_instructions,
                        distance_text: step.distance.text,
                        duration_text: step.duration.text,
                    })
                    .collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> GoogleMapsClient {
        GoogleMapsClient::new("test-key").with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_geocode_parses_first_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/geocode/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("address".into(), "Jakarta".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"OK","results":[{"formatted_address":"Jakarta, Indonesia",
                "geometry":{"location":{"lat":-6.2088,"lng":106.8456}},"place_id":"abc"}]}"#,
            )
            .create_async()
            .await;

        let result = client(&server).geocode("Jakarta").await.unwrap();
        mock.assert_async().await;
        assert_eq!(result.formatted_address, "Jakarta, Indonesia");
        assert_eq!(result.place_id.as_deref(), Some("abc"));
        assert_eq!(result.coordinates(), "-6.2088,106.8456");
    }

    #[tokio::test]
    async fn test_geocode_without_match_is_collaborator_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/geocode/json")
            .match_query(Matcher::Any)
            .with_body(r#"{"status":"ZERO_RESULTS","results":[]}"#)
            .create_async()
            .await;

        let err = client(&server).geocode("Atlantis").await.unwrap_err();
        assert!(matches!(err, PlannerError::Collaborator { .. }));
        assert!(err.to_string().contains("Atlantis"));
    }

    #[tokio::test]
    async fn test_matrix_keeps_failed_cells() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/distancematrix/json")
            .match_query(Matcher::UrlEncoded("origins".into(), "A|B".into()))
            .with_body(
                r#"{"status":"OK","rows":[
                    {"elements":[
                        {"status":"OK","distance":{"text":"0 km","value":0},"duration":{"text":"1 min","value":0}},
                        {"status":"OK","distance":{"text":"12 km","value":12000},"duration":{"text":"30 mins","value":1800},
                         "duration_in_traffic":{"text":"45 mins","value":2700}}]},
                    {"elements":[
                        {"status":"ZERO_RESULTS"},
                        {"status":"OK","distance":{"text":"0 km","value":0},"duration":{"text":"1 min","value":0}}]}
                ]}"#,
            )
            .create_async()
            .await;

        let request = MatrixRequest::square(vec!["A".into(), "B".into()], TravelMode::Driving);
        let entries = client(&server).distance_matrix(&request).await.unwrap();

        assert_eq!(entries.len(), 4);
        let a_to_b = entries[1].leg().unwrap();
        assert_eq!(a_to_b.duration_in_traffic_seconds, Some(2700));
        assert!(!entries[2].is_ok());
        assert_eq!(entries[2].origin, "B");
        assert_eq!(entries[2].destination, "A");
    }

    #[tokio::test]
    async fn test_matrix_without_ok_cells_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/distancematrix/json")
            .match_query(Matcher::Any)
            .with_body(r#"{"status":"OK","rows":[{"elements":[{"status":"NOT_FOUND"}]}]}"#)
            .create_async()
            .await;

        let request = MatrixRequest::square(vec!["A".into()], TravelMode::Driving);
        let err = client(&server).distance_matrix(&request).await.unwrap_err();
        assert!(matches!(err, PlannerError::Collaborator { .. }));
    }

    #[tokio::test]
    async fn test_matrix_rejects_blank_locations() {
        let server = mockito::Server::new_async().await;
        let request = MatrixRequest::square(vec!["  ".into()], TravelMode::Driving);
        let err = client(&server).distance_matrix(&request).await.unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_places_sorted_by_rating() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/place/nearbysearch/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "restaurant".into()),
                Matcher::UrlEncoded("minprice".into(), "2".into()),
                Matcher::UrlEncoded("radius".into(), "1000".into()),
            ]))
            .with_body(
                r#"{"status":"OK","results":[
                    {"name":"Warung","vicinity":"Jl. A","rating":4.1},
                    {"name":"Unrated","vicinity":"Jl. B"},
                    {"name":"Skye","formatted_address":"BCA Tower","rating":4.6,"types":["restaurant"]}
                ]}"#,
            )
            .create_async()
            .await;

        let query = PlaceQuery::business_restaurants("-6.2,106.8");
        let places = client(&server).search_places(&query).await.unwrap();
        let names: Vec<&str> = places.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Skye", "Warung", "Unrated"]);
        assert_eq!(places[1].address, "Jl. A");
        assert_eq!(places[0].business_status.as_deref(), Some("OPERATIONAL"));
    }

    #[tokio::test]
    async fn test_directions_with_alternatives() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/directions/json")
            .match_query(Matcher::UrlEncoded("alternatives".into(), "true".into()))
            .with_body(
                r#"{"status":"OK","routes":[
                    {"summary":"Toll Road","legs":[{"start_address":"A","end_address":"B",
                      "distance":{"text":"20 km","value":20000},"duration":{"text":"35 mins","value":2100},
                      "steps":[{"html_instructions":"Head north","distance":{"text":"1 km","value":1000},"duration":{"text":"2 mins","value":120}}]}]},
                    {"summary":"Inner Ring","legs":[{"start_address":"A","end_address":"B",
                      "distance":{"text":"18 km","value":18000},"duration":{"text":"50 mins","value":3000}}]}
                ]}"#,
            )
            .create_async()
            .await;

        let request = DirectionsRequest::new("A", "B", TravelMode::Driving).with_alternatives();
        let result = client(&server).directions(&request).await.unwrap();
        assert_eq!(result.primary.summary, "Toll Road");
        assert_eq!(result.primary.steps.len(), 1);
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.routes().count(), 2);
    }

    #[tokio::test]
    async fn test_http_error_is_collaborator_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/directions/json")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let request = DirectionsRequest::new("A", "B", TravelMode::Driving);
        let err = client(&server).directions(&request).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
