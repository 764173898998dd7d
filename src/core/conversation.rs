use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::info;

use crate::context::{Operation, PlanningContext, PlanningState};
use crate::error::PlannerError;
use crate::services::openai_client::ChatTurn;
use crate::types::{Plan, Requirement};

/// Conversation state machine stages, in their only allowed order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PlanningStage {
    #[default]
    Understanding,
    InitialPlanning,
    InteractiveOptimization,
    FinalConfirmation,
    Execution,
}

impl PlanningStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanningStage::Understanding => "understanding",
            PlanningStage::InitialPlanning => "initial_planning",
            PlanningStage::InteractiveOptimization => "interactive_optimization",
            PlanningStage::FinalConfirmation => "final_confirmation",
            PlanningStage::Execution => "execution",
        }
    }

    pub fn next(&self) -> Option<PlanningStage> {
        match self {
            PlanningStage::Understanding => Some(PlanningStage::InitialPlanning),
            PlanningStage::InitialPlanning => Some(PlanningStage::InteractiveOptimization),
            PlanningStage::InteractiveOptimization => Some(PlanningStage::FinalConfirmation),
            PlanningStage::FinalConfirmation => Some(PlanningStage::Execution),
            PlanningStage::Execution => None,
        }
    }
}

impl fmt::Display for PlanningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    ToolCall,
    ToolResult,
    ToolError,
    Report,
}

/// One entry of the user-visible transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub kind: MessageKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

/// A planning conversation: transcript, stage, requirement and plan history.
///
/// `plan_versions` is append-only; `current_plan` is always its last element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: Option<String>,
    pub stage: PlanningStage,
    pub messages: Vec<Message>,
    pub current_requirement: Option<Requirement>,
    pub current_plan: Option<Plan>,
    pub plan_versions: Vec<Plan>,
    pub context: PlanningContext,
    pub planning_state: PlanningState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: Option<String>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        Self {
            planning_state: PlanningState::new(id.clone()),
            id,
            user_id,
            stage: PlanningStage::Understanding,
            messages: Vec::new(),
            current_requirement: None,
            current_plan: None,
            plan_versions: Vec::new(),
            context: PlanningContext::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_message(
        &mut self,
        role: MessageRole,
        kind: MessageKind,
        content: impl Into<String>,
        metadata: Value,
    ) -> &Message {
        self.messages.push(Message {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            kind,
            content: content.into(),
            metadata,
            timestamp: Utc::now(),
        });
        self.updated_at = Utc::now();
        &self.messages[self.messages.len() - 1]
    }

    pub fn add_user_text(&mut self, content: impl Into<String>) {
        self.add_message(MessageRole::User, MessageKind::Text, content, Value::Null);
    }

    pub fn add_assistant_text(&mut self, content: impl Into<String>) {
        self.add_message(MessageRole::Assistant, MessageKind::Text, content, Value::Null);
    }

    /// Move forward to `target`. Returns false, leaving the stage alone, when `target` is
    /// not ahead of the current stage.
    pub fn advance_to(&mut self, target: PlanningStage) -> bool {
        if target <= self.stage {
            return false;
        }
        info!(
            target: "trip_planner::orchestrator",
            "conversation {} stage {} -> {}",
            self.id,
            self.stage,
            target
        );
        self.stage = target;
        self.updated_at = Utc::now();
        true
    }

    pub fn set_requirement(&mut self, requirement: Requirement) {
        self.current_requirement = Some(requirement);
        self.updated_at = Utc::now();
    }

    /// Record a new plan version and make it current
    pub fn set_plan(&mut self, plan: Plan) {
        self.plan_versions.push(plan.clone());
        self.current_plan = Some(plan);
        self.updated_at = Utc::now();
    }

    /// Record a failed action in both the planning state and the planning log
    pub fn record_error(&mut self, action: &str, error: &PlannerError) {
        let message = error.to_string();
        self.planning_state
            .add_error(action, message.clone(), Some(self.stage.to_string()));
        self.context.record_failure(
            Operation::Conversation {
                action: action.to_string(),
            },
            message,
        );
        self.updated_at = Utc::now();
    }

    pub fn plan_version(&self, version: u32) -> Option<&Plan> {
        self.plan_versions.iter().find(|p| p.version == version)
    }

    /// Text turns for the language model, oldest first. Tool records stay out of the history.
    pub fn chat_history(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Text)
            .filter_map(|m| match m.role {
                MessageRole::User => Some(ChatTurn::user(&m.content)),
                MessageRole::Assistant => Some(ChatTurn::assistant(&m.content)),
                _ => None,
            })
            .collect()
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User && m.kind == MessageKind::Text)
            .map(|m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DayPlan;

    #[test]
    fn test_record_error_reaches_state_and_log() {
        let mut conversation = Conversation::new(None);
        let err = PlannerError::invalid_stage("execute_plan", conversation.stage);
        conversation.record_error("execute_plan", &err);

        assert_eq!(conversation.planning_state.errors.len(), 1);
        assert_eq!(conversation.planning_state.errors[0].kind, "execute_plan");
        assert_eq!(
            conversation.planning_state.errors[0].context.as_deref(),
            Some("understanding")
        );
        let entry = conversation.context.last_entry().unwrap();
        assert_eq!(entry.operation.kind(), "conversation");
        assert_eq!(entry.error.as_deref(), Some(err.to_string().as_str()));
    }

    #[test]
    fn test_stage_only_moves_forward() {
        let mut conversation = Conversation::new(None);
        assert!(conversation.advance_to(PlanningStage::InitialPlanning));
        assert!(!conversation.advance_to(PlanningStage::Understanding));
        assert!(!conversation.advance_to(PlanningStage::InitialPlanning));
        assert_eq!(conversation.stage, PlanningStage::InitialPlanning);
        assert_eq!(
            PlanningStage::FinalConfirmation.next(),
            Some(PlanningStage::Execution)
        );
        assert_eq!(PlanningStage::Execution.next(), None);
    }

    #[test]
    fn test_stage_wire_names() {
        assert_eq!(
            serde_json::to_value(PlanningStage::InteractiveOptimization).unwrap(),
            "interactive_optimization"
        );
    }

    #[test]
    fn test_plan_versions_are_kept() {
        let mut conversation = Conversation::new(Some("bob".to_string()));
        let requirement = Requirement::new("Jakarta", 1, 1).unwrap();
        let first = Plan::new(requirement, vec![DayPlan::new(1, "Day 1", vec![])]);
        let mut second = first.next_version();
        second.title = "Changed".to_string();

        conversation.set_plan(first.clone());
        conversation.set_plan(second);

        assert_eq!(conversation.plan_versions.len(), 2);
        assert_eq!(conversation.plan_version(1), Some(&first));
        assert_eq!(conversation.current_plan.as_ref().unwrap().version, 2);
    }

    #[test]
    fn test_chat_history_skips_tool_records() {
        let mut conversation = Conversation::new(None);
        conversation.add_user_text("Plan a trip to Jakarta");
        conversation.add_message(
            MessageRole::Tool,
            MessageKind::ToolResult,
            "{}",
            serde_json::json!({"tool": "geocode"}),
        );
        conversation.add_assistant_text("Sure");

        let history = conversation.chat_history();
        assert_eq!(history.len(), 2);
        assert_eq!(conversation.last_user_text(), Some("Plan a trip to Jakarta"));
    }
}
