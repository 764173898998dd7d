mod common;

use std::sync::Arc;

use common::{call, FakeMaps, ScriptedLlm};
use serde_json::json;
use trip_planner_rs::core::{MessageKind, PlanningStage};
use trip_planner_rs::services::{ChatReply, JsonFilePlanStore, PlanStore};
use trip_planner_rs::tools::names;
use trip_planner_rs::types::{Plan, Requirement};
use trip_planner_rs::{order_route, Orchestrator, PlannerError};

fn planner(llm: Arc<ScriptedLlm>, maps: FakeMaps) -> Orchestrator {
    Orchestrator::new(llm, Arc::new(maps)).unwrap()
}

fn requirement_call() -> ChatReply {
    call(
        "call_req",
        names::EXTRACT_TRAVEL_REQUIREMENT,
        json!({
            "destination": "Jakarta",
            "duration_days": 2,
            "group_size": 3,
            "transportation_mode": "driving",
            "preferences": ["visit industrial parks"]
        }),
    )
}

fn assert_days_consistent(plan: &Plan) {
    for day in &plan.days {
        assert!(!day.places().is_empty(), "day {} has no places", day.day);
        let sum: u32 = day.places().iter().map(|p| p.estimated_duration).sum();
        assert_eq!(day.total_estimated_minutes(), sum);
    }
}

#[tokio::test]
async fn test_planning_keyword_moves_to_initial_planning() {
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let planner = planner(llm.clone(), FakeMaps::default());

    let response = planner.start_conversation(None, "开始规划").await.unwrap();

    assert_eq!(response.stage, PlanningStage::InitialPlanning);
    assert!(response.requirement.is_none());
    assert!(response.plan.is_none());
    // Without a requirement the model gets the planning tools
    let offered = llm.offered_tools();
    assert!(offered[0].contains(&names::GENERATE_INITIAL_PLAN.to_string()));
}

#[tokio::test]
async fn test_full_conversation_to_execution() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFilePlanStore::open(dir.path()).await.unwrap());
    let llm = Arc::new(ScriptedLlm::new(vec![
        requirement_call(),
        ChatReply::text("Two days in Jakarta for three people. Shall I start planning?"),
        call("call_val", names::VALIDATE_PLAN, json!({})),
        ChatReply::text("The plan is complete. Run execute when ready."),
    ]));
    let maps = FakeMaps::default().without_pair("Sudirman CBD", "Mega Kuningan");
    let planner = planner(llm.clone(), maps).with_plan_store(store.clone());

    let first = planner
        .start_conversation(Some("u-1".to_string()), "3 of us need to visit Jakarta for 2 days")
        .await
        .unwrap();
    assert_eq!(first.stage, PlanningStage::InitialPlanning);
    assert_eq!(
        llm.offered_tools()[0],
        vec![names::EXTRACT_TRAVEL_REQUIREMENT.to_string()]
    );
    let id = first.conversation_id.clone();

    let second = planner.continue_conversation(&id, "start planning").await.unwrap();
    assert_eq!(second.stage, PlanningStage::InteractiveOptimization);
    let plan = second.plan.unwrap();
    assert_eq!(plan.days.len(), 2);
    assert_eq!(plan.total_places(), 4);
    assert_days_consistent(&plan);

    let third = planner.continue_conversation(&id, "Looks good, please check it").await.unwrap();
    assert_eq!(third.stage, PlanningStage::FinalConfirmation);
    assert!(third.requires_confirmation);
    assert_eq!(llm.remaining(), 0);

    let report = planner.execute_plan(&id).await.unwrap();
    assert_eq!(report.plan_id, plan.id);
    let day1 = &report.itinerary.days[0];
    assert_eq!(day1.order, vec!["MM2100", "Jababeka"]);
    assert_eq!(day1.segments.len(), 1);
    // The missing matrix pair leaves day 2 without a segment but keeps both stops
    let day2 = &report.itinerary.days[1];
    assert_eq!(day2.order.len(), 2);
    assert!(day2.segments.is_empty());
    assert_eq!(report.itinerary.lodging.len(), 2);
    assert!(report.markdown.contains("Jakarta"));
    assert_days_consistent(&report.itinerary.plan);

    let saved = store.get(&plan.id).await.unwrap().unwrap();
    assert_eq!(saved.plan.version, plan.version);

    let conversation = planner.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conversation.stage, PlanningStage::Execution);
    assert_eq!(
        conversation.messages.last().map(|m| m.kind),
        Some(MessageKind::Report)
    );
}

#[tokio::test]
async fn test_modifications_keep_version_history() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        requirement_call(),
        ChatReply::text("Got it."),
        call(
            "call_mod",
            names::MODIFY_PLAN,
            json!({"modification": {
                "type": "add_place",
                "day": 1,
                "place": {"name": "Tanjung Priok Port", "address": "Tanjung Priok", "duration": 90}
            }}),
        ),
        ChatReply::text("Added the port visit to day 1."),
    ]));
    let planner = planner(llm, FakeMaps::default());

    let id = planner
        .start_conversation(None, "Jakarta, 2 days, 3 people")
        .await
        .unwrap()
        .conversation_id;
    planner.continue_conversation(&id, "开始规划").await.unwrap();
    let response = planner
        .continue_conversation(&id, "Add a port visit on day 1")
        .await
        .unwrap();
    assert_eq!(response.stage, PlanningStage::InteractiveOptimization);

    let conversation = planner.get_conversation(&id).await.unwrap().unwrap();
    let v1 = conversation.plan_version(1).unwrap();
    let v2 = conversation.plan_version(2).unwrap();
    assert_eq!(v1.days[0].places().len(), 2);
    assert_eq!(v2.days[0].places().len(), 3);
    assert_eq!(v2.days[0].total_estimated_minutes(), v1.days[0].total_estimated_minutes() + 90);
    assert_eq!(conversation.current_plan.as_ref().map(|p| p.version), Some(2));
    assert_days_consistent(v2);

    let tool_records = conversation
        .messages
        .iter()
        .filter(|m| matches!(m.kind, MessageKind::ToolCall | MessageKind::ToolResult))
        .count();
    assert_eq!(tool_records, 4);
}

#[tokio::test]
async fn test_execute_is_rejected_until_confirmed() {
    let llm = Arc::new(ScriptedLlm::new(vec![requirement_call(), ChatReply::text("ok")]));
    let planner = planner(llm, FakeMaps::default());
    let id = planner
        .start_conversation(None, "Jakarta trip")
        .await
        .unwrap()
        .conversation_id;
    planner.continue_conversation(&id, "开始规划").await.unwrap();

    let err = planner.execute_plan(&id).await.unwrap_err();
    assert!(matches!(err, PlannerError::InvalidStage { .. }));
    assert!(err.is_user_facing());

    let conversation = planner.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conversation.stage, PlanningStage::InteractiveOptimization);
}

#[tokio::test]
async fn test_empty_searches_fall_back_to_synthesized_places() {
    let llm = Arc::new(ScriptedLlm::new(vec![requirement_call(), ChatReply::text("ok")]));
    let planner = planner(
        llm,
        FakeMaps {
            empty_searches: true,
            ..FakeMaps::default()
        },
    );
    let id = planner
        .start_conversation(None, "Jakarta trip")
        .await
        .unwrap()
        .conversation_id;
    let plan = planner
        .continue_conversation(&id, "start planning")
        .await
        .unwrap()
        .plan
        .unwrap();

    let names: Vec<&str> = plan
        .days
        .iter()
        .flat_map(|d| d.places().iter().map(|p| p.name.as_str()))
        .collect();
    assert_eq!(names, vec!["Jakarta industrial park", "Jakarta business district"]);
}

#[tokio::test]
async fn test_keyword_first_conversation_still_reaches_a_plan() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        ChatReply::text("Where are you travelling, for how long and how many of you?"),
        ChatReply::text("Noted."),
        requirement_call(),
        ChatReply::text("Jakarta for two days, building the plan."),
    ]));
    let planner = planner(llm.clone(), FakeMaps::default());

    let first = planner.start_conversation(None, "开始规划").await.unwrap();
    assert_eq!(first.stage, PlanningStage::InitialPlanning);
    assert!(first.requirement.is_none());

    let second = planner
        .continue_conversation(&first.conversation_id, "3 of us, Jakarta, 2 days")
        .await
        .unwrap();
    // Requests: first turn, its extraction fallback, then the second turn
    assert!(llm.offered_tools()[2].contains(&names::EXTRACT_TRAVEL_REQUIREMENT.to_string()));
    assert_eq!(second.stage, PlanningStage::InteractiveOptimization);
    assert_eq!(second.requirement.as_ref().map(|r| r.destination()), Some("Jakarta"));
    let plan = second.plan.unwrap();
    assert_eq!(plan.days.len(), 2);
    assert!(second.message.contains(&plan.title));
    assert_days_consistent(&plan);

    let conversation = planner
        .get_conversation(&first.conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!conversation
        .messages
        .iter()
        .any(|m| m.kind == MessageKind::ToolError));
}

#[tokio::test]
async fn test_synthesized_fallback_plan_executes_with_both_stops() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        call(
            "call_req",
            names::EXTRACT_TRAVEL_REQUIREMENT,
            json!({"destination": "Jakarta", "duration_days": 1, "group_size": 2}),
        ),
        ChatReply::text("One day in Jakarta."),
        call("call_val", names::VALIDATE_PLAN, json!({})),
        ChatReply::text("Ready to execute."),
    ]));
    let planner = planner(
        llm,
        FakeMaps {
            empty_searches: true,
            ..FakeMaps::default()
        },
    );
    let id = planner
        .start_conversation(None, "Jakarta for a day")
        .await
        .unwrap()
        .conversation_id;
    planner.continue_conversation(&id, "start planning").await.unwrap();
    let confirmed = planner.continue_conversation(&id, "validate it").await.unwrap();
    assert_eq!(confirmed.stage, PlanningStage::FinalConfirmation);

    let report = planner.execute_plan(&id).await.unwrap();
    let day1 = &report.itinerary.days[0];
    assert_eq!(
        day1.order,
        vec!["Jakarta industrial park", "Jakarta business district"]
    );
    assert_eq!(day1.segments.len(), 1);
    assert!(report.itinerary.lodging.is_empty());
}

#[test]
fn test_round_trip_route_ends_at_start() {
    let stops = vec!["MM2100".to_string(), "Jababeka".to_string()];
    let route = order_route(&stops, "Hotel", Some("Hotel"), &[]);
    assert_eq!(route.first().map(String::as_str), Some("Hotel"));
    assert_eq!(route.last().map(String::as_str), Some("Hotel"));
    assert_eq!(route.len(), 4);
}

#[tokio::test]
async fn test_conversations_can_be_listed_and_deleted() {
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let planner = planner(llm, FakeMaps::default());
    let a = planner.start_conversation(None, "hello").await.unwrap();
    planner.start_conversation(None, "hi").await.unwrap();

    assert_eq!(planner.list_conversations().await.unwrap().len(), 2);
    assert!(planner.delete_conversation(&a.conversation_id).await.unwrap());
    assert!(!planner.delete_conversation(&a.conversation_id).await.unwrap());
    assert_eq!(planner.list_conversations().await.unwrap().len(), 1);

    let err = planner
        .continue_conversation(&a.conversation_id, "still there?")
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[test]
fn test_requirement_defaults() {
    let requirement = Requirement::new("Jakarta", 2, 3).unwrap();
    assert_eq!(requirement.destination(), "Jakarta");
    assert!(Requirement::new("Jakarta", 0, 3).is_err());
}
