#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use trip_planner_rs::error::{PlannerError, Result};
use trip_planner_rs::services::{
    ChatReply, ChatRequest, DirectionsRequest, LanguageModel, MapsProvider, MatrixRequest,
    PlaceQuery,
};
use trip_planner_rs::types::{
    DirectionsResult, GeocodeResult, MatrixEntry, MatrixLeg, PlaceCandidate, RouteSummary,
};
use trip_planner_rs::ToolCall;

/// Language model that answers from a script and records the tools it was offered
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<ChatReply>>,
    offered: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<ChatReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            offered: Mutex::new(Vec::new()),
        }
    }

    /// Tool names offered in each request so far
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply> {
        let names = request
            .tools
            .iter()
            .filter_map(|t| t["function"]["name"].as_str().map(str::to_string))
            .collect();
        self.offered.lock().unwrap().push(names);
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChatReply::text("Noted.")))
    }
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ChatReply {
    ChatReply::with_tool_calls(vec![ToolCall::new(id, name, arguments)])
}

/// Maps provider over a small fixed Jakarta world.
///
/// Every pair is 20 minutes apart unless listed in `missing_pairs`, which the matrix
/// leaves out entirely.
#[derive(Default)]
pub struct FakeMaps {
    pub missing_pairs: HashSet<(String, String)>,
    pub empty_searches: bool,
}

impl FakeMaps {
    pub fn without_pair(mut self, origin: &str, destination: &str) -> Self {
        self.missing_pairs
            .insert((origin.to_string(), destination.to_string()));
        self
    }
}

fn candidate(name: &str, rating: f64) -> PlaceCandidate {
    PlaceCandidate::new(name, name).with_rating(rating)
}

#[async_trait]
impl MapsProvider for FakeMaps {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult> {
        Ok(GeocodeResult {
            formatted_address: format!("{address}, Jakarta, Indonesia"),
            lat: -6.2,
            lng: 106.8,
            place_id: None,
        })
    }

    async fn search_places(&self, query: &PlaceQuery) -> Result<Vec<PlaceCandidate>> {
        if self.empty_searches {
            return Ok(Vec::new());
        }
        let q = query.query.as_str();
        let found = if q.starts_with("industrial park") {
            vec![candidate("MM2100", 4.4), candidate("Jababeka", 4.2)]
        } else if q.starts_with("business district") {
            vec![candidate("Sudirman CBD", 4.6), candidate("Mega Kuningan", 4.5)]
        } else if q.starts_with("business hotel") {
            vec![candidate("Hotel Indonesia Kempinski", 4.7), candidate("Ayana", 4.6)]
        } else {
            Vec::new()
        };
        Ok(found)
    }

    async fn distance_matrix(&self, request: &MatrixRequest) -> Result<Vec<MatrixEntry>> {
        if request.origins.is_empty() {
            return Err(PlannerError::collaborator("maps", "INVALID_REQUEST"));
        }
        let mut entries = Vec::new();
        for origin in &request.origins {
            for destination in &request.destinations {
                if self
                    .missing_pairs
                    .contains(&(origin.clone(), destination.clone()))
                {
                    continue;
                }
                let seconds = if origin == destination { 0 } else { 1_200 };
                entries.push(MatrixEntry::ok(
                    origin,
                    destination,
                    MatrixLeg {
                        distance_meters: seconds * 10,
                        distance_text: format!("{} km", seconds / 100),
                        duration_seconds: seconds,
                        duration_text: format!("{} mins", seconds / 60),
                        duration_in_traffic_seconds: None,
                        duration_in_traffic_text: None,
                    },
                ));
            }
        }
        Ok(entries)
    }

    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResult> {
        Ok(DirectionsResult {
            primary: RouteSummary {
                origin: request.origin.clone(),
                destination: request.destination.clone(),
                distance_meters: 12_000,
                distance_text: "12 km".to_string(),
                duration_seconds: 1_200,
                duration_text: "20 mins".to_string(),
                duration_in_traffic_seconds: None,
                duration_in_traffic_text: None,
                summary: "Jl. Gatot Subroto".to_string(),
                steps: vec![],
            },
            alternatives: vec![],
        })
    }
}
