use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use jsonschema::{Draft, JSONSchema};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::core::conversation::Conversation;
use crate::core::tool_call::{ToolCall, ToolExecution, ToolOutput};
use crate::error::{PlannerError, Result};
use crate::services::maps_client::MapsProvider;

const MAX_SCHEMA_ERRORS: usize = 3;

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;

/// What a tool may read and change while it runs
pub struct ToolContext<'a> {
    pub conversation: &'a mut Conversation,
    pub maps: &'a dyn MapsProvider,
}

/// A tool that can be executed on behalf of the language model
pub trait Tool: Send + Sync + std::fmt::Debug {
    /// The name of the tool (used in function calls)
    fn name(&self) -> &'static str;

    /// A description of what the tool does
    fn description(&self) -> &'static str;

    /// JSON Schema for the tool's parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with arguments already checked against [`Tool::parameters_schema`]
    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a>;
}

/// Draft 7 schema derived from a parameter type
pub fn schema_for<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// Deserialize tool arguments, naming the offending path on failure
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    serde_path_to_error::deserialize(arguments).map_err(|e| {
        PlannerError::Validation(format!(
            "Invalid arguments for '{}' at {}: {}",
            tool,
            e.path(),
            e.inner()
        ))
    })
}

/// Named tools available to the orchestrator
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Function definitions for every registered tool, sorted by name
    pub fn to_openai_tools(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(name))
            .map(openai_definition)
            .collect()
    }

    /// Function definitions for the named tools that are registered, in the given order
    pub fn to_openai_tools_for(&self, names: &[&str]) -> Vec<Value> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .map(openai_definition)
            .collect()
    }

    /// Check arguments against the tool's Draft 7 schema
    pub fn validate_arguments(&self, tool: &dyn Tool, arguments: &Value) -> Result<()> {
        let schema = tool.parameters_schema();
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|err| {
                PlannerError::Validation(format!(
                    "Failed to prepare schema for '{}': {}",
                    tool.name(),
                    err
                ))
            })?;

        if let Err(errors) = validator.validate(arguments) {
            let details: Vec<String> = errors
                .take(MAX_SCHEMA_ERRORS)
                .map(|error| {
                    let mut path = error.instance_path.to_string();
                    if path.is_empty() {
                        path = "<root>".to_string();
                    }
                    format!("{}: {}", path, error)
                })
                .collect();
            return Err(PlannerError::Validation(format!(
                "Arguments for '{}' do not match its schema: {}",
                tool.name(),
                details.join("; ")
            )));
        }
        Ok(())
    }

    /// Look up, validate and run a tool
    pub async fn dispatch(&self, name: &str, arguments: Value, ctx: ToolContext<'_>) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| PlannerError::ToolNotFound(name.to_string()))?;
        self.validate_arguments(tool, &arguments)?;
        tool.execute(arguments, ctx).await
    }

    /// Run a tool call and capture the result or error as a [`ToolOutput`]
    pub async fn execute(&self, call: &ToolCall, ctx: ToolContext<'_>) -> ToolOutput {
        info!(target: "trip_planner::tools", "executing {}", call.describe());
        let execution = ToolExecution::start(call.clone());
        match self.dispatch(&call.name, call.arguments.clone(), ctx).await {
            Ok(value) => execution.complete(value),
            Err(err) => {
                warn!(target: "trip_planner::tools", "tool {} failed: {}", call.name, err);
                execution.complete_with_error(&err)
            }
        }
    }
}

fn openai_definition(tool: &dyn Tool) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name(),
            "description": tool.description(),
            "parameters": tool.parameters_schema()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoParams {
        text: String,
        #[serde(default)]
        repeat: Option<u32>,
    }

    #[derive(Debug)]
    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo text back"
        }

        fn parameters_schema(&self) -> Value {
            schema_for::<EchoParams>()
        }

        fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
            Box::pin(async move {
                let params: EchoParams = parse_arguments(self.name(), arguments)?;
                ctx.conversation.add_assistant_text(params.text.clone());
                Ok(Value::String(params.text.repeat(params.repeat.unwrap_or(1) as usize)))
            })
        }
    }

    #[derive(Debug)]
    struct NoMaps;

    #[async_trait::async_trait]
    impl MapsProvider for NoMaps {
        async fn geocode(&self, _: &str) -> Result<crate::types::GeocodeResult> {
            Err(PlannerError::collaborator("maps", "offline"))
        }
        async fn search_places(
            &self,
            _: &crate::services::maps_client::PlaceQuery,
        ) -> Result<Vec<crate::types::PlaceCandidate>> {
            Err(PlannerError::collaborator("maps", "offline"))
        }
        async fn distance_matrix(
            &self,
            _: &crate::services::maps_client::MatrixRequest,
        ) -> Result<Vec<crate::types::MatrixEntry>> {
            Err(PlannerError::collaborator("maps", "offline"))
        }
        async fn directions(
            &self,
            _: &crate::services::maps_client::DirectionsRequest,
        ) -> Result<crate::types::DirectionsResult> {
            Err(PlannerError::collaborator("maps", "offline"))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry
    }

    #[tokio::test]
    async fn test_dispatch_runs_tool_with_context() {
        let registry = registry();
        let mut conversation = Conversation::new(None);
        let ctx = ToolContext {
            conversation: &mut conversation,
            maps: &NoMaps,
        };
        let value = registry
            .dispatch("echo", serde_json::json!({"text": "ab", "repeat": 2}), ctx)
            .await
            .unwrap();
        assert_eq!(value, "abab");
        assert_eq!(conversation.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_schema_violation_is_rejected_before_execution() {
        let registry = registry();
        let mut conversation = Conversation::new(None);
        let call = ToolCall::new("call_1", "echo", serde_json::json!({"repeat": "twice"}));
        let output = registry
            .execute(
                &call,
                ToolContext {
                    conversation: &mut conversation,
                    maps: &NoMaps,
                },
            )
            .await;
        assert!(output.is_error);
        assert_eq!(output.output["error"]["code"], "VALIDATION_ERROR");
        assert!(conversation.messages.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = registry();
        let mut conversation = Conversation::new(None);
        let err = registry
            .dispatch(
                "missing",
                Value::Null,
                ToolContext {
                    conversation: &mut conversation,
                    maps: &NoMaps,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "TOOL_NOT_FOUND");
    }

    #[test]
    fn test_openai_definitions() {
        let registry = registry();
        let tools = registry.to_openai_tools();
        assert_eq!(tools[0]["function"]["name"], "echo");
        assert_eq!(tools[0]["function"]["parameters"]["type"], "object");
        assert!(registry.to_openai_tools_for(&["missing"]).is_empty());
    }

    #[test]
    fn test_parse_arguments_names_path() {
        let err = parse_arguments::<EchoParams>("echo", serde_json::json!({"text": 5})).unwrap_err();
        assert!(err.to_string().contains("text"));
    }
}
