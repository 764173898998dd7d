//! trip-planner-rs: conversational business-trip itinerary planning
//!
//! A conversation moves through five stages (understanding, initial planning, interactive
//! optimization, final confirmation, execution). A language model drives the early stages
//! through named tools; execution runs a fixed pipeline that geocodes stops, orders each
//! day's route, schedules it around rush hours and scores every leg for traffic risk.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trip_planner_rs::{GoogleMapsClient, OpenAIClient, Orchestrator, PlannerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PlannerConfig::from_env()?;
//!     let llm = OpenAIClient::new(config.openai_api_key.clone()).with_model(config.model.clone());
//!     let maps = GoogleMapsClient::new(config.google_maps_api_key.clone());
//!     let planner = Orchestrator::new(Arc::new(llm), Arc::new(maps))?;
//!
//!     let reply = planner
//!         .start_conversation(None, "Three of us visit Jakarta for 2 days")
//!         .await?;
//!     println!("{}", reply.message);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod routing;
pub mod services;
pub mod tools;
pub mod types;
pub mod workflow;

pub use config::PlannerConfig;
pub use crate::core::{
    Conversation, ConversationResponse, Orchestrator, PlanModification, PlanningStage,
    ToolCall, ToolOutput, ValidationReport,
};
pub use error::{PlannerError, Result};
pub use routing::{order_route, RiskThresholds, ScheduleConstraints, TrafficModel};
pub use services::{
    GoogleMapsClient, LanguageModel, MapsProvider, MarkdownReportFormatter, OpenAIClient,
    ReportFormatter,
};
pub use tools::{Tool, ToolRegistry};
pub use types::{DayPlan, Place, Plan, Requirement, RiskLevel, TravelMode};
pub use workflow::{ExecutionReport, ItineraryPipeline};

#[cfg(feature = "cli")]
pub mod cli;
