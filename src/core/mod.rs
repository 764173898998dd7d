pub mod conversation;
pub mod orchestrator;
pub mod plan_builder;
pub mod prompts;
pub mod requirement_extraction;
pub mod stage_policy;
pub mod tool_call;

pub use conversation::{Conversation, Message, MessageKind, MessageRole, PlanningStage};
pub use orchestrator::{suggested_actions, ConversationResponse, Orchestrator};
pub use plan_builder::{
    generate_initial_plan, modify_plan, validate_plan, PlaceInput, PlanModification,
    ValidationReport,
};
pub use requirement_extraction::RequirementExtractor;
pub use stage_policy::{KeywordIntentPolicy, PlanningIntentPolicy, PLANNING_KEYWORDS};
pub use tool_call::{ToolCall, ToolExecution, ToolOutput};
