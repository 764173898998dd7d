//! Multi-turn planning conversations.
//!
//! The orchestrator owns stage transitions. Tools only change the conversation's
//! requirement and plan; after each tool result the orchestrator decides whether the
//! conversation moves forward.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::context::{planning_digest, LogStatus};
use crate::core::conversation::{Conversation, MessageKind, MessageRole, PlanningStage};
use crate::core::plan_builder;
use crate::core::prompts::{
    extraction_prompt, extraction_request, stage_temperature, stage_tools, system_prompt,
};
use crate::core::requirement_extraction::RequirementExtractor;
use crate::core::stage_policy::{KeywordIntentPolicy, PlanningIntentPolicy};
use crate::core::tool_call::{ToolCall, ToolOutput};
use crate::error::{PlannerError, Result};
use crate::routing::ScheduleConstraints;
use crate::services::maps_client::{MapsProvider, PlaceQuery};
use crate::services::openai_client::{ChatRequest, ChatTurn, LanguageModel};
use crate::services::store::{
    ConversationStore, ConversationSummary, InMemoryConversationStore, InMemoryPlanStore,
    PlanStore, PlanSummary, StoredPlan,
};
use crate::tools::{names, ToolContext, ToolRegistry};
use crate::types::{Place, Plan, Requirement};
use crate::workflow::{ExecutionReport, ItineraryPipeline};

pub const DEFAULT_MAX_ITERATIONS: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Places kept from the automatic searches
pub const MAX_AUTO_PLACES: usize = 5;

/// (search term, radius in meters, results kept)
const AUTO_SEARCHES: [(&str, u32, usize); 3] = [
    ("industrial park", 30_000, 3),
    ("business district", 20_000, 3),
    ("supplier company", 30_000, 2),
];

/// Reply to one user turn
#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub stage: PlanningStage,
    pub message: String,
    pub requirement: Option<Requirement>,
    pub plan: Option<Plan>,
    pub suggested_actions: Vec<String>,
    /// Set when the plan waits for an explicit execute
    pub requires_confirmation: bool,
}

pub fn suggested_actions(stage: PlanningStage) -> Vec<String> {
    let actions: &[&str] = match stage {
        PlanningStage::Understanding => &[
            "Tell me the destination, number of days and group size",
            "List the companies or areas you need to visit",
        ],
        PlanningStage::InitialPlanning => &[
            "Say \"start planning\" to generate the first plan",
            "Name any must-visit locations",
        ],
        PlanningStage::InteractiveOptimization => &[
            "Add or remove a stop",
            "Rename a day's theme",
            "Ask me to validate the plan",
        ],
        PlanningStage::FinalConfirmation => &[
            "Run execute to build the final schedule",
            "Review the current plan",
        ],
        PlanningStage::Execution => &[
            "Ask about the schedule or traffic risks",
            "Save the report",
        ],
    };
    actions.iter().map(|a| a.to_string()).collect()
}

pub struct Orchestrator {
    llm: Arc<dyn LanguageModel>,
    maps: Arc<dyn MapsProvider>,
    tools: ToolRegistry,
    conversations: Arc<dyn ConversationStore>,
    plans: Arc<dyn PlanStore>,
    pipeline: ItineraryPipeline,
    intent: Box<dyn PlanningIntentPolicy>,
    extractor: RequirementExtractor,
    max_iterations: usize,
    timeout: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tools", &self.tools.names())
            .field("max_iterations", &self.max_iterations)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LanguageModel>, maps: Arc<dyn MapsProvider>) -> Result<Self> {
        Ok(Self {
            llm,
            pipeline: ItineraryPipeline::new(maps.clone()),
            maps,
            tools: ToolRegistry::with_planner_tools(),
            conversations: Arc::new(InMemoryConversationStore::new()),
            plans: Arc::new(InMemoryPlanStore::new()),
            intent: Box::new(KeywordIntentPolicy::default()),
            extractor: RequirementExtractor::new()?,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_conversation_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.conversations = store;
        self
    }

    pub fn with_plan_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.plans = store;
        self
    }

    pub fn with_intent_policy(mut self, policy: impl PlanningIntentPolicy + 'static) -> Self {
        self.intent = Box::new(policy);
        self
    }

    pub fn with_constraints(mut self, constraints: ScheduleConstraints) -> Self {
        self.pipeline = self.pipeline.with_constraints(constraints);
        self
    }

    pub fn with_pipeline(mut self, pipeline: ItineraryPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a conversation and process its first message
    pub async fn start_conversation(
        &self,
        user_id: Option<String>,
        message: &str,
    ) -> Result<ConversationResponse> {
        let mut conversation = Conversation::new(user_id);
        info!(target: "trip_planner::orchestrator", "conversation {} started", conversation.id);
        let result = self.process_turn(&mut conversation, message).await;
        self.conversations.put(&conversation).await?;
        result
    }

    pub async fn continue_conversation(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<ConversationResponse> {
        let mut conversation = self.load(conversation_id).await?;
        let result = self.process_turn(&mut conversation, message).await;
        self.conversations.put(&conversation).await?;
        result
    }

    /// Run the itinerary pipeline over the confirmed plan and save the report.
    ///
    /// Only allowed in the final confirmation stage with a plan; anything else is rejected.
    pub async fn execute_plan(&self, conversation_id: &str) -> Result<ExecutionReport> {
        let mut conversation = self.load(conversation_id).await?;
        let plan = match (conversation.stage, conversation.current_plan.clone()) {
            (PlanningStage::FinalConfirmation, Some(plan)) => plan,
            (stage, plan) => {
                let operation = if plan.is_none() {
                    "execute a missing plan"
                } else {
                    "execute the plan"
                };
                let err = PlannerError::invalid_stage(operation, stage);
                warn!(target: "trip_planner::orchestrator", "execute rejected: {}", err);
                conversation.record_error("execute_plan", &err);
                self.conversations.put(&conversation).await?;
                return Err(err);
            }
        };

        conversation.advance_to(PlanningStage::Execution);
        let result = self
            .pipeline
            .run(
                &plan,
                &mut conversation.planning_state,
                &mut conversation.context,
            )
            .await;

        match result {
            Ok(report) => {
                self.plans
                    .save(&StoredPlan::new(
                        plan,
                        report.markdown.clone(),
                        report.itinerary.clone(),
                    ))
                    .await?;
                conversation.add_message(
                    MessageRole::Assistant,
                    MessageKind::Report,
                    report.markdown.clone(),
                    json!({"plan_id": report.plan_id, "version": report.version}),
                );
                self.conversations.put(&conversation).await?;
                info!(
                    target: "trip_planner::orchestrator",
                    "conversation {} executed plan {} v{}",
                    conversation.id,
                    report.plan_id,
                    report.version
                );
                Ok(report)
            }
            Err(err) => {
                warn!(target: "trip_planner::orchestrator", "execution failed: {}", err);
                self.conversations.put(&conversation).await?;
                Err(err)
            }
        }
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        self.conversations.get(conversation_id).await
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.conversations.list().await
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<bool> {
        self.conversations.delete(conversation_id).await
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<StoredPlan>> {
        self.plans.get(plan_id).await
    }

    pub async fn list_plans(&self) -> Result<Vec<PlanSummary>> {
        self.plans.list().await
    }

    async fn load(&self, conversation_id: &str) -> Result<Conversation> {
        self.conversations
            .get(conversation_id)
            .await?
            .ok_or_else(|| PlannerError::NotFound(format!("conversation {}", conversation_id)))
    }

    async fn process_turn(
        &self,
        conversation: &mut Conversation,
        message: &str,
    ) -> Result<ConversationResponse> {
        conversation.add_user_text(message);

        if conversation.stage == PlanningStage::Understanding && self.intent.wants_planning(message)
        {
            info!(target: "trip_planner::orchestrator", "planning keyword detected");
            conversation.advance_to(PlanningStage::InitialPlanning);
        }

        let reply = if conversation.stage == PlanningStage::InitialPlanning
            && conversation.current_requirement.is_some()
        {
            let plan = self.auto_initial_plan(conversation).await?;
            plan_overview(&plan)
        } else {
            // Planning was already requested when the turn opens in initial planning, so
            // a requirement recorded during it leads straight to a plan
            let planning_requested = conversation.stage == PlanningStage::InitialPlanning;
            let reply = self.run_model_turn(conversation).await?;
            if matches!(
                conversation.stage,
                PlanningStage::Understanding | PlanningStage::InitialPlanning
            ) && conversation.current_requirement.is_none()
            {
                self.fallback_extraction(conversation).await;
            }
            if planning_requested
                && conversation.stage == PlanningStage::InitialPlanning
                && conversation.current_requirement.is_some()
                && conversation.current_plan.is_none()
            {
                let plan = self.auto_initial_plan(conversation).await?;
                if reply.trim().is_empty() {
                    plan_overview(&plan)
                } else {
                    format!("{}\n\n{}", reply, plan_overview(&plan))
                }
            } else {
                reply
            }
        };

        conversation.add_assistant_text(reply.clone());
        Ok(respond(conversation, reply))
    }

    /// Chat with the language model, running its tool calls until it answers in text
    async fn run_model_turn(&self, conversation: &mut Conversation) -> Result<String> {
        let mut turns = conversation.chat_history();

        for iteration in 1..=self.max_iterations {
            let stage = conversation.stage;
            let request = ChatRequest::new(
                system_prompt(stage, &planning_digest(conversation)),
                turns.clone(),
            )
            .with_tools(self.tools.to_openai_tools_for(stage_tools(stage)))
            .with_temperature(stage_temperature(stage));

            let reply = match timeout(self.timeout, self.llm.chat(request)).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(err)) => {
                    conversation.record_error("language_model", &err);
                    return Err(err);
                }
                Err(_) => {
                    let err = PlannerError::Timeout("language model call timed out".to_string());
                    conversation.record_error("language_model", &err);
                    return Err(err);
                }
            };

            if reply.tool_calls.is_empty() {
                return Ok(reply.content.unwrap_or_default());
            }
            debug!(
                target: "trip_planner::orchestrator",
                "iteration {}: {} tool call(s) in stage {}",
                iteration,
                reply.tool_calls.len(),
                stage
            );

            turns.push(ChatTurn::assistant_with_calls(
                reply.content_or_empty(),
                reply.tool_calls.clone(),
            ));
            for call in &reply.tool_calls {
                let output = self.run_tool(conversation, call).await;
                turns.push(ChatTurn::tool_result(&call.id, output.as_string()));
            }
        }

        warn!(
            target: "trip_planner::orchestrator",
            "tool loop hit the limit of {} iterations",
            self.max_iterations
        );
        Ok("I ran out of steps for this turn. Tell me how you would like to continue.".to_string())
    }

    /// Run one tool call, record it as a call and a result message, then apply any
    /// stage transition the result implies
    async fn run_tool(&self, conversation: &mut Conversation, call: &ToolCall) -> ToolOutput {
        conversation.add_message(
            MessageRole::Assistant,
            MessageKind::ToolCall,
            call.describe(),
            json!({"tool_call_id": call.id, "name": call.name, "arguments": call.arguments}),
        );

        let stage = conversation.stage;
        let output = if stage_tools(stage).contains(&call.name.as_str()) {
            self.tools
                .execute(
                    call,
                    ToolContext {
                        conversation: &mut *conversation,
                        maps: self.maps.as_ref(),
                    },
                )
                .await
        } else {
            let err = PlannerError::invalid_stage(format!("call {}", call.name), stage);
            conversation.record_error(&call.name, &err);
            ToolOutput::error(call.id.clone(), call.name.clone(), &err)
        };

        let kind = if output.is_error {
            MessageKind::ToolError
        } else {
            MessageKind::ToolResult
        };
        conversation.add_message(
            MessageRole::Tool,
            kind,
            output.as_string(),
            json!({"tool_call_id": call.id, "name": call.name, "duration_ms": output.duration_ms}),
        );

        if !output.is_error {
            apply_transition(conversation, &call.name, &output.output);
        }
        output
    }

    /// Ask the model for a JSON requirement, then fall back to text patterns.
    /// A failure is recorded in the planning state and leaves the conversation unchanged.
    async fn fallback_extraction(&self, conversation: &mut Conversation) {
        let text: String = conversation
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User && m.kind == MessageKind::Text)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let request = ChatRequest::new(extraction_prompt(), vec![ChatTurn::user(extraction_request(&text))])
            .with_temperature(0.0);
        let model_reply = match timeout(self.timeout, self.llm.chat(request)).await {
            Ok(Ok(reply)) => reply.content,
            Ok(Err(err)) => {
                debug!(target: "trip_planner::orchestrator", "extraction request failed: {}", err);
                conversation.record_error("language_model", &err);
                None
            }
            Err(_) => {
                let err = PlannerError::Timeout("extraction request timed out".to_string());
                conversation.record_error("language_model", &err);
                None
            }
        };

        match self.extractor.extract(&text, model_reply.as_deref()) {
            Ok(requirement) => {
                info!(
                    target: "trip_planner::orchestrator",
                    "requirement extracted without a tool call: {}",
                    requirement.destination()
                );
                conversation.set_requirement(requirement);
                conversation.advance_to(PlanningStage::InitialPlanning);
            }
            Err(err) => {
                debug!(target: "trip_planner::orchestrator", "no requirement yet: {}", err);
                conversation.record_error("requirement_extraction", &err);
            }
        }
    }

    /// Search for candidate places around the destination and build the first plan
    async fn auto_initial_plan(&self, conversation: &mut Conversation) -> Result<Plan> {
        let requirement = conversation.current_requirement.clone().ok_or_else(|| {
            PlannerError::invalid_stage("generate a plan without a requirement", conversation.stage)
        })?;
        let destination = requirement.destination();

        let mut places: Vec<Place> = Vec::new();
        for (term, radius, keep) in AUTO_SEARCHES {
            let query = PlaceQuery::text(format!("{} {}", term, destination)).near(destination, radius);
            match self.maps.search_places(&query).await {
                Ok(found) => {
                    conversation.planning_state.add_place_search_operation(
                        &query.query,
                        found.len(),
                        LogStatus::Success,
                    );
                    for candidate in found.into_iter().take(keep) {
                        if places.iter().any(|p| p.name == candidate.name) {
                            continue;
                        }
                        places.push(candidate.into_place(vec![format!("Matches \"{}\"", term)]));
                    }
                }
                Err(err) => {
                    warn!(target: "trip_planner::orchestrator", "search for {} failed: {}", term, err);
                    conversation
                        .planning_state
                        .add_place_search_operation(&query.query, 0, LogStatus::Failed);
                    conversation.record_error(names::SEARCH_PLACES, &err);
                }
            }
        }
        places.truncate(MAX_AUTO_PLACES);

        if places.is_empty() {
            places = vec![
                Place::new(format!("{} industrial park", destination), destination)
                    .with_category("industrial_park")
                    .with_description("Main industrial area")
                    .with_reasons(vec!["Typical site for factory visits".to_string()]),
                Place::new(format!("{} business district", destination), destination)
                    .with_category("business_district")
                    .with_description("Central business district")
                    .with_reasons(vec!["Offices and meeting venues".to_string()]),
            ];
        }

        let plan = plan_builder::generate_initial_plan(&requirement, places);
        info!(
            target: "trip_planner::orchestrator",
            "initial plan {} with {} places over {} days",
            plan.id,
            plan.total_places(),
            plan.days.len()
        );
        conversation.set_plan(plan.clone());
        conversation.advance_to(PlanningStage::InteractiveOptimization);
        Ok(plan)
    }
}

/// Stage changes implied by a successful tool result
fn apply_transition(conversation: &mut Conversation, tool: &str, output: &Value) {
    match (conversation.stage, tool) {
        (PlanningStage::Understanding, names::EXTRACT_TRAVEL_REQUIREMENT) => {
            conversation.advance_to(PlanningStage::InitialPlanning);
        }
        (PlanningStage::InitialPlanning, names::GENERATE_INITIAL_PLAN) => {
            conversation.advance_to(PlanningStage::InteractiveOptimization);
        }
        (PlanningStage::InteractiveOptimization, names::VALIDATE_PLAN) => {
            if output.get("valid").and_then(Value::as_bool) == Some(true) {
                conversation.advance_to(PlanningStage::FinalConfirmation);
            }
        }
        _ => {}
    }
}

fn plan_overview(plan: &Plan) -> String {
    let mut lines = vec![format!("{} (version {})", plan.title, plan.version), plan.overall_summary.clone()];
    for day in &plan.days {
        let stops: Vec<&str> = day.places().iter().map(|p| p.name.as_str()).collect();
        lines.push(format!("{}: {}", day.theme, stops.join(", ")));
    }
    lines.push("Tell me what to change, or ask me to validate the plan.".to_string());
    lines.join("\n")
}

fn respond(conversation: &Conversation, message: String) -> ConversationResponse {
    ConversationResponse {
        conversation_id: conversation.id.clone(),
        stage: conversation.stage,
        message,
        requirement: conversation.current_requirement.clone(),
        plan: conversation.current_plan.clone(),
        suggested_actions: suggested_actions(conversation.stage),
        requires_confirmation: conversation.stage == PlanningStage::FinalConfirmation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::maps_client::{DirectionsRequest, MatrixRequest};
    use crate::services::openai_client::ChatReply;
    use crate::types::{DirectionsResult, GeocodeResult, MatrixEntry, PlaceCandidate};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedModel {
        replies: Mutex<VecDeque<ChatReply>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<ChatReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatReply> {
            let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
            Ok(next.unwrap_or_else(|| ChatReply::text("ok")))
        }
    }

    struct SearchOnlyMaps;

    #[async_trait]
    impl MapsProvider for SearchOnlyMaps {
        async fn geocode(&self, _address: &str) -> Result<GeocodeResult> {
            Err(PlannerError::collaborator("maps", "offline"))
        }
        async fn search_places(&self, query: &PlaceQuery) -> Result<Vec<PlaceCandidate>> {
            if query.query.starts_with("supplier") {
                return Err(PlannerError::collaborator("maps", "OVER_QUERY_LIMIT"));
            }
            Ok(vec![
                PlaceCandidate::new(format!("{} A", query.query), "addr").with_rating(4.5),
                PlaceCandidate::new(format!("{} B", query.query), "addr").with_rating(4.0),
                PlaceCandidate::new("Shared Tower", "addr").with_rating(3.9),
            ])
        }
        async fn distance_matrix(&self, _request: &MatrixRequest) -> Result<Vec<MatrixEntry>> {
            Err(PlannerError::collaborator("maps", "offline"))
        }
        async fn directions(&self, _request: &DirectionsRequest) -> Result<DirectionsResult> {
            Err(PlannerError::collaborator("maps", "offline"))
        }
    }

    fn orchestrator(replies: Vec<ChatReply>) -> Orchestrator {
        Orchestrator::new(Arc::new(ScriptedModel::new(replies)), Arc::new(SearchOnlyMaps)).unwrap()
    }

    #[tokio::test]
    async fn test_requirement_tool_call_advances_stage() {
        let orchestrator = orchestrator(vec![
            ChatReply::with_tool_calls(vec![ToolCall::new(
                "call_1",
                names::EXTRACT_TRAVEL_REQUIREMENT,
                json!({"destination": "Jakarta", "duration_days": 2, "group_size": 3}),
            )]),
            ChatReply::text("Got it, 2 days in Jakarta."),
        ]);

        let response = orchestrator
            .start_conversation(None, "We are 3 people going to Jakarta for 2 days")
            .await
            .unwrap();
        assert_eq!(response.stage, PlanningStage::InitialPlanning);
        assert_eq!(response.message, "Got it, 2 days in Jakarta.");

        let conversation = orchestrator
            .get_conversation(&response.conversation_id)
            .await
            .unwrap()
            .unwrap();
        let kinds: Vec<MessageKind> = conversation.messages.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MessageKind::Text,
                MessageKind::ToolCall,
                MessageKind::ToolResult,
                MessageKind::Text
            ]
        );
    }

    #[tokio::test]
    async fn test_auto_plan_dedupes_and_absorbs_failed_search() {
        let orchestrator = orchestrator(vec![]);
        let first = orchestrator
            .start_conversation(None, "我们3人要去雅加达出差2天")
            .await
            .unwrap();
        assert_eq!(first.stage, PlanningStage::InitialPlanning);

        let second = orchestrator
            .continue_conversation(&first.conversation_id, "开始规划")
            .await
            .unwrap();
        assert_eq!(second.stage, PlanningStage::InteractiveOptimization);
        let plan = second.plan.unwrap();
        assert_eq!(plan.total_places(), MAX_AUTO_PLACES);
        assert_eq!(plan.days.len(), 2);

        let conversation = orchestrator
            .get_conversation(&first.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.planning_state.place_search_operations.len(), 3);
        assert!(conversation
            .planning_state
            .errors
            .iter()
            .any(|e| e.kind == "search_places"));
    }

    #[tokio::test]
    async fn test_tool_outside_stage_is_rejected() {
        let orchestrator = orchestrator(vec![
            ChatReply::with_tool_calls(vec![ToolCall::new(
                "call_1",
                names::MODIFY_PLAN,
                json!({"modification": {"type": "remove_place", "day": 1, "name": "x"}}),
            )]),
            ChatReply::text("Which city?"),
        ]);
        let response = orchestrator.start_conversation(None, "hello").await.unwrap();
        assert_eq!(response.stage, PlanningStage::Understanding);

        let conversation = orchestrator
            .get_conversation(&response.conversation_id)
            .await
            .unwrap()
            .unwrap();
        let error = conversation
            .messages
            .iter()
            .find(|m| m.kind == MessageKind::ToolError)
            .unwrap();
        assert!(error.content.contains("INVALID_STAGE"));
        assert_eq!(conversation.planning_state.errors[0].kind, names::MODIFY_PLAN);
        assert_eq!(
            conversation.context.last_entry().map(|e| e.status),
            Some(LogStatus::Failed)
        );
    }

    #[tokio::test]
    async fn test_execute_rejected_before_confirmation() {
        let orchestrator = orchestrator(vec![]);
        let response = orchestrator.start_conversation(None, "hello").await.unwrap();
        let err = orchestrator
            .execute_plan(&response.conversation_id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STAGE");
        let conversation = orchestrator
            .get_conversation(&response.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert!(conversation
            .planning_state
            .errors
            .iter()
            .any(|e| e.kind == "execute_plan"));

        let err = orchestrator.execute_plan("missing").await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    struct DownModel;

    #[async_trait]
    impl LanguageModel for DownModel {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatReply> {
            Err(PlannerError::collaborator("llm", "503 Service Unavailable"))
        }
    }

    struct SlowModel;

    #[async_trait]
    impl LanguageModel for SlowModel {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatReply> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ChatReply::text("late"))
        }
    }

    #[tokio::test]
    async fn test_model_failure_is_recorded_and_saved() {
        let orchestrator = Orchestrator::new(Arc::new(DownModel), Arc::new(SearchOnlyMaps)).unwrap();
        let err = orchestrator.start_conversation(None, "hello").await.unwrap_err();
        assert!(err.is_retryable());

        let listed = orchestrator.list_conversations().await.unwrap();
        let conversation = orchestrator
            .get_conversation(&listed[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.planning_state.errors[0].kind, "language_model");
        assert_eq!(
            conversation.context.last_entry().map(|e| e.operation.kind()),
            Some("conversation")
        );
    }

    #[tokio::test]
    async fn test_model_timeout_is_recorded() {
        let orchestrator = Orchestrator::new(Arc::new(SlowModel), Arc::new(SearchOnlyMaps))
            .unwrap()
            .with_timeout(Duration::from_millis(20));
        let err = orchestrator.start_conversation(None, "hello").await.unwrap_err();
        assert_eq!(err.error_code(), "TIMEOUT_ERROR");

        let listed = orchestrator.list_conversations().await.unwrap();
        let conversation = orchestrator
            .get_conversation(&listed[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.planning_state.errors.len(), 1);
    }

    #[test]
    fn test_confirmation_flag_and_actions() {
        assert!(suggested_actions(PlanningStage::FinalConfirmation)[0].contains("execute"));
        let mut conversation = Conversation::new(None);
        conversation.advance_to(PlanningStage::FinalConfirmation);
        assert!(respond(&conversation, String::new()).requires_confirmation);
    }
}
