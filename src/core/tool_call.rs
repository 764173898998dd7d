use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::error::{PlannerError, Result};

/// Represents a tool call request from the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool to execute
    pub name: String,
    /// Arguments to pass to the tool
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Parse a tool call from OpenAI response format.
    ///
    /// Arguments arrive as a JSON-encoded string; an empty string means no arguments.
    pub fn try_from_openai_format(tool_call: &Value) -> Result<Self> {
        let id = tool_call
            .get("id")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        let function = tool_call.get("function").ok_or_else(|| {
            PlannerError::InvalidFunctionCall("Tool call is missing its function".to_string())
        })?;
        let name = function
            .get("name")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                PlannerError::InvalidFunctionCall("Tool call is missing a function name".to_string())
            })?
            .to_string();

        let arguments_str = function
            .get("arguments")
            .and_then(|value| value.as_str())
            .unwrap_or("");
        let arguments = if arguments_str.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments_str).map_err(|err| {
                PlannerError::InvalidFunctionCall(format!(
                    "Failed to parse arguments for tool '{}': {}",
                    name, err
                ))
            })?
        };

        Ok(Self {
            id,
            name,
            arguments,
        })
    }

    /// Convert to OpenAI tool call format
    pub fn to_openai_format(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": serde_json::to_string(&self.arguments).unwrap_or_default()
            }
        })
    }

    /// Get a human-readable description
    pub fn describe(&self) -> String {
        format!("{}({})", self.name, self.arguments)
    }
}

/// Represents the output from a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub tool_name: String,
    pub output: Value,
    pub is_error: bool,
    /// Execution duration in milliseconds
    pub duration_ms: Option<u128>,
}

impl ToolOutput {
    pub fn success(tool_call_id: String, tool_name: String, output: Value) -> Self {
        Self {
            tool_call_id,
            tool_name,
            output,
            is_error: false,
            duration_ms: None,
        }
    }

    /// Error output carrying the error's structured payload
    pub fn error(tool_call_id: String, tool_name: String, error: &PlannerError) -> Self {
        Self {
            tool_call_id,
            tool_name,
            output: error.to_error_payload(),
            is_error: true,
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis());
        self
    }

    /// Get the output as a string for message content
    pub fn as_string(&self) -> String {
        match &self.output {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Tracks the execution of a tool call with timing information
#[derive(Debug)]
pub struct ToolExecution {
    pub tool_call: ToolCall,
    start_time: Instant,
}

impl ToolExecution {
    pub fn start(tool_call: ToolCall) -> Self {
        Self {
            tool_call,
            start_time: Instant::now(),
        }
    }

    pub fn complete(self, output: Value) -> ToolOutput {
        let duration = self.start_time.elapsed();
        ToolOutput::success(self.tool_call.id, self.tool_call.name, output).with_duration(duration)
    }

    pub fn complete_with_error(self, error: &PlannerError) -> ToolOutput {
        let duration = self.start_time.elapsed();
        ToolOutput::error(self.tool_call.id, self.tool_call.name, error).with_duration(duration)
    }
}
