//! Records exchanged with the mapping provider.

use super::plan::Place;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub lat: f64,
    pub lng: f64,
    pub place_id: Option<String>,
}

impl GeocodeResult {
    /// `lat,lng` form accepted by the place search endpoints
    pub fn coordinates(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// A place returned by the place search collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub name: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub place_id: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: u32,
    pub price_level: Option<u8>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub business_status: Option<String>,
}

impl PlaceCandidate {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            lat: None,
            lng: None,
            place_id: None,
            rating: None,
            user_ratings_total: 0,
            price_level: None,
            types: Vec::new(),
            business_status: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    /// Turn a search hit into a plan stop
    pub fn into_place(self, reasons: Vec<String>) -> Place {
        let category = self
            .types
            .first()
            .cloned()
            .unwrap_or_else(|| "business".to_string());
        let description = match self.rating {
            Some(rating) => format!("{} (rated {:.1})", category.replace('_', " "), rating),
            None => category.replace('_', " "),
        };
        Place::new(self.name, self.address)
            .with_category(category)
            .with_rating(self.rating)
            .with_description(description)
            .with_reasons(reasons)
    }
}

/// Metrics of a successful distance-matrix cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixLeg {
    pub distance_meters: u64,
    pub distance_text: String,
    pub duration_seconds: u64,
    pub duration_text: String,
    pub duration_in_traffic_seconds: Option<u64>,
    pub duration_in_traffic_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatrixElement {
    Ok(MatrixLeg),
    Failed { status: String, error: String },
}

/// One origin/destination cell. Failed cells are kept with their error rather than omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub origin: String,
    pub destination: String,
    #[serde(flatten)]
    pub element: MatrixElement,
}

impl MatrixEntry {
    pub fn ok(origin: impl Into<String>, destination: impl Into<String>, leg: MatrixLeg) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            element: MatrixElement::Ok(leg),
        }
    }

    pub fn failed(
        origin: impl Into<String>,
        destination: impl Into<String>,
        status: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            element: MatrixElement::Failed {
                status: status.into(),
                error: error.into(),
            },
        }
    }

    pub fn leg(&self) -> Option<&MatrixLeg> {
        match &self.element {
            MatrixElement::Ok(leg) => Some(leg),
            MatrixElement::Failed { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.leg().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    pub distance_text: String,
    pub duration_text: String,
}

/// One driving route between two points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub origin: String,
    pub destination: String,
    pub distance_meters: u64,
    pub distance_text: String,
    pub duration_seconds: u64,
    pub duration_text: String,
    pub duration_in_traffic_seconds: Option<u64>,
    pub duration_in_traffic_text: Option<String>,
    /// Main road name(s)
    pub summary: String,
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResult {
    pub primary: RouteSummary,
    pub alternatives: Vec<RouteSummary>,
}

impl DirectionsResult {
    /// All routes with the primary first
    pub fn routes(&self) -> impl Iterator<Item = &RouteSummary> {
        std::iter::once(&self.primary).chain(self.alternatives.iter())
    }
}
