use thiserror::Error;

/// Main error type for the planner
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external collaborator (maps provider, language model) failed or returned no data
    #[error("{service} error: {message}")]
    Collaborator { service: String, message: String },

    /// Some items of a batch failed; the rest is usable
    #[error("Partial data: {0}")]
    PartialData(String),

    /// The conversation is in a stage that does not permit the operation
    #[error("Cannot {operation} while conversation is in stage '{stage}'")]
    InvalidStage { operation: String, stage: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid function call: {0}")]
    InvalidFunctionCall(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Rate limit exceeded: retry after {retry_after}s")]
    RateLimit { retry_after: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    pub fn collaborator(service: impl Into<String>, message: impl Into<String>) -> Self {
        PlannerError::Collaborator {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn invalid_stage(operation: impl Into<String>, stage: impl std::fmt::Display) -> Self {
        PlannerError::InvalidStage {
            operation: operation.into(),
            stage: stage.to_string(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlannerError::Collaborator { .. }
                | PlannerError::RateLimit { .. }
                | PlannerError::Timeout(_)
        )
    }

    /// Whether the error should be shown to the user as a rejection rather than absorbed
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PlannerError::InvalidStage { .. } | PlannerError::Validation(_)
        )
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PlannerError::Config(_) => "CONFIG_ERROR",
            PlannerError::Collaborator { .. } => "COLLABORATOR_ERROR",
            PlannerError::PartialData(_) => "PARTIAL_DATA",
            PlannerError::InvalidStage { .. } => "INVALID_STAGE",
            PlannerError::Validation(_) => "VALIDATION_ERROR",
            PlannerError::Serialization(_) => "SERIALIZATION_ERROR",
            PlannerError::ToolExecution(_) => "TOOL_EXECUTION_ERROR",
            PlannerError::ToolNotFound(_) => "TOOL_NOT_FOUND",
            PlannerError::InvalidFunctionCall(_) => "INVALID_FUNCTION_CALL",
            PlannerError::Timeout(_) => "TIMEOUT_ERROR",
            PlannerError::RateLimit { .. } => "RATE_LIMIT_ERROR",
            PlannerError::Storage(_) => "STORAGE_ERROR",
            PlannerError::NotFound(_) => "NOT_FOUND",
            PlannerError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        })
    }
}
