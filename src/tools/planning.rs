//! Tools that read and change the conversation's requirement and plan.
//!
//! These only touch the conversation; moving between planning stages is left to the
//! orchestrator, which inspects the tool results.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::names;
use super::tool::{parse_arguments, schema_for, Tool, ToolContext, ToolFuture};
use crate::core::plan_builder::{self, PlaceInput, PlanModification};
use crate::error::PlannerError;
use crate::types::RequirementDraft;

#[derive(Debug, Default)]
pub struct ExtractRequirementTool;

impl Tool for ExtractRequirementTool {
    fn name(&self) -> &'static str {
        names::EXTRACT_TRAVEL_REQUIREMENT
    }

    fn description(&self) -> &'static str {
        "Record the traveller's business trip requirement: destination, days, group size, transport mode, preferences and constraints"
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<RequirementDraft>()
    }

    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
        Box::pin(async move {
            let draft: RequirementDraft = parse_arguments(self.name(), arguments)?;
            let conversation = ctx.conversation;
            let requirement = match draft.validate() {
                Ok(requirement) => requirement,
                Err(err) => {
                    conversation
                        .planning_state
                        .add_error(self.name(), err.to_string(), None);
                    return Err(err);
                }
            };
            info!(
                target: "trip_planner::tools",
                "requirement recorded: {} for {} days",
                requirement.destination(),
                requirement.duration_days()
            );
            let value = serde_json::to_value(&requirement)?;
            conversation.set_requirement(requirement);
            Ok(value)
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InitialPlanParams {
    /// Places selected for the trip, in visiting order
    #[serde(default)]
    pub places: Vec<PlaceInput>,
    /// Requirement to plan for; replaces the recorded one when given
    #[serde(default)]
    pub requirement: Option<RequirementDraft>,
}

#[derive(Debug, Default)]
pub struct GenerateInitialPlanTool;

impl Tool for GenerateInitialPlanTool {
    fn name(&self) -> &'static str {
        names::GENERATE_INITIAL_PLAN
    }

    fn description(&self) -> &'static str {
        "Spread the selected places over the trip days and create the first version of the plan"
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<InitialPlanParams>()
    }

    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
        Box::pin(async move {
            let params: InitialPlanParams = parse_arguments(self.name(), arguments)?;
            let conversation = ctx.conversation;
            let requirement = match params.requirement {
                Some(draft) => {
                    let requirement = draft.validate().map_err(|err| {
                        conversation
                            .planning_state
                            .add_error(self.name(), err.to_string(), None);
                        err
                    })?;
                    conversation.set_requirement(requirement.clone());
                    requirement
                }
                None => conversation.current_requirement.clone().ok_or_else(|| {
                    PlannerError::invalid_stage(self.name(), "no requirement has been recorded yet")
                })?,
            };

            let places = params
                .places
                .into_iter()
                .map(|p| p.into_place(&["Matches your requirements"]))
                .collect();
            let plan = plan_builder::generate_initial_plan(&requirement, places);
            let value = serde_json::to_value(&plan)?;
            conversation.set_plan(plan);
            Ok(value)
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ModifyPlanParams {
    pub modification: PlanModification,
}

#[derive(Debug, Default)]
pub struct ModifyPlanTool;

impl Tool for ModifyPlanTool {
    fn name(&self) -> &'static str {
        names::MODIFY_PLAN
    }

    fn description(&self) -> &'static str {
        "Change the current plan: add_place, remove_place, change_theme or replace_places. Creates a new plan version"
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<ModifyPlanParams>()
    }

    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
        Box::pin(async move {
            let params: ModifyPlanParams = parse_arguments(self.name(), arguments)?;
            let conversation = ctx.conversation;
            let current = conversation
                .current_plan
                .as_ref()
                .ok_or_else(|| PlannerError::invalid_stage(self.name(), "there is no plan yet"))?;

            let kind = params.modification.kind();
            let plan = plan_builder::modify_plan(current, params.modification)?;
            info!(
                target: "trip_planner::tools",
                "plan {} modified ({}), now version {}",
                plan.id,
                kind,
                plan.version
            );
            let value = serde_json::to_value(&plan)?;
            conversation.set_plan(plan);
            Ok(value)
        })
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ValidatePlanParams {}

#[derive(Debug, Default)]
pub struct ValidatePlanTool;

impl Tool for ValidatePlanTool {
    fn name(&self) -> &'static str {
        names::VALIDATE_PLAN
    }

    fn description(&self) -> &'static str {
        "Check the current plan for missing days, empty days and overloaded days"
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<ValidatePlanParams>()
    }

    fn execute<'a>(&'a self, arguments: Value, ctx: ToolContext<'a>) -> ToolFuture<'a> {
        Box::pin(async move {
            let _: ValidatePlanParams = parse_arguments(self.name(), arguments)?;
            let plan = ctx
                .conversation
                .current_plan
                .as_ref()
                .ok_or_else(|| PlannerError::invalid_stage(self.name(), "there is no plan yet"))?;
            Ok(serde_json::to_value(plan_builder::validate_plan(plan))?)
        })
    }
}
