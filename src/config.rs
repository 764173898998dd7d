//! Runtime configuration from the environment (and `.env` via `dotenvy`).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PlannerError, Result};
use crate::services::openai_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub google_maps_api_key: String,
    pub google_maps_base_url: Option<String>,
    pub timeout: Duration,
    /// Directory for the JSON plan store; plans stay in memory when unset
    pub plan_dir: Option<PathBuf>,
}

impl PlannerConfig {
    /// Read the configuration, loading a `.env` file first when one exists
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as missing
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                PlannerError::Config(format!("{} environment variable must be set", key))
            })
        };

        let timeout_secs = match get("PLANNER_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                PlannerError::Config(format!("PLANNER_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: get("OPENAI_BASE_URL")
                .or_else(|| get("OPENROUTER_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("PLANNER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            google_maps_api_key: required("GOOGLE_MAPS_API_KEY")?,
            google_maps_base_url: get("GOOGLE_MAPS_BASE_URL"),
            timeout: Duration::from_secs(timeout_secs),
            plan_dir: get("PLANNER_PLAN_DIR").map(PathBuf::from),
        })
    }
}
