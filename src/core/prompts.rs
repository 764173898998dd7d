use crate::context::PlanningDigest;
use crate::core::conversation::PlanningStage;
use crate::tools::names;

const UNDERSTANDING_PROMPT: &str = "You are a business-trip itinerary planning assistant. \
Your job is to understand the traveller's request and extract their business travel requirements.

Focus on business travel, not tourism:
- meeting venues such as office towers, business districts and industrial parks
- avoiding rush-hour traffic that could delay meetings
- clear routes without backtracking
- lodging that balances commute time and cost

Identify the destination, number of days, group size, transportation mode, type of business \
activity, fixed anchor locations, candidate locations, constraints (rush-hour limits, maximum \
one-way travel time), lodging preferences and any hard requirements.

When you have enough information call `extract_travel_requirement`. If key details are \
missing, ask for them politely.";

const INITIAL_PLANNING_PROMPT: &str = "You are a business-trip itinerary planning assistant. \
Build a day-by-day business itinerary for the requirement below.

If no requirement has been recorded yet, collect the destination, days and group size and \
call `extract_travel_requirement` first. Use `search_places` and `geocode` to find business \
locations, then call `generate_initial_plan` with the places you selected. Group stops by area to avoid \
backtracking, keep one-way travel under two hours, and avoid the 07:00-09:00 and 16:30-18:30 \
rush hours where possible.";

const OPTIMIZATION_PROMPT: &str = "You are a business-trip itinerary planning assistant. \
The traveller is reviewing the current plan and may ask for changes.

Understand the feedback, look up new information with the map tools when needed, and apply \
changes with `modify_plan`. Explain what changed and why. When the traveller is satisfied, \
call `validate_plan`.";

const CONFIRMATION_PROMPT: &str = "The traveller has validated the plan. Summarise it, point \
out remaining timing risks, and tell them to run the execute command to produce the final \
schedule with traffic risk analysis.";

const EXECUTION_PROMPT: &str = "The plan has been executed and the final itinerary report is \
available. Answer questions about it concisely.";

const EXTRACTION_PROMPT: &str = "Extract the business travel requirement from the user's text \
and reply with a single JSON object with the fields destination, duration_days, group_size, \
transportation_mode, preferences, constraints, budget and special_notes. Leave out fields that \
are not mentioned.";

pub fn stage_prompt(stage: PlanningStage) -> &'static str {
    match stage {
        PlanningStage::Understanding => UNDERSTANDING_PROMPT,
        PlanningStage::InitialPlanning => INITIAL_PLANNING_PROMPT,
        PlanningStage::InteractiveOptimization => OPTIMIZATION_PROMPT,
        PlanningStage::FinalConfirmation => CONFIRMATION_PROMPT,
        PlanningStage::Execution => EXECUTION_PROMPT,
    }
}

/// Stage prompt followed by the planning digest
pub fn system_prompt(stage: PlanningStage, digest: &PlanningDigest) -> String {
    format!("{}\n\n{}", stage_prompt(stage), digest.to_prompt_block())
}

/// Sampling temperature per stage; later stages are more deterministic
pub fn stage_temperature(stage: PlanningStage) -> f32 {
    match stage {
        PlanningStage::Understanding | PlanningStage::InitialPlanning => 0.7,
        PlanningStage::InteractiveOptimization => 0.6,
        PlanningStage::FinalConfirmation | PlanningStage::Execution => 0.3,
    }
}

/// Tools offered to the language model in each stage
pub fn stage_tools(stage: PlanningStage) -> &'static [&'static str] {
    match stage {
        PlanningStage::Understanding => &[names::EXTRACT_TRAVEL_REQUIREMENT],
        PlanningStage::InitialPlanning => &[
            names::EXTRACT_TRAVEL_REQUIREMENT,
            names::SEARCH_PLACES,
            names::GEOCODE,
            names::GENERATE_INITIAL_PLAN,
        ],
        PlanningStage::InteractiveOptimization => &[
            names::MODIFY_PLAN,
            names::VALIDATE_PLAN,
            names::SEARCH_PLACES,
            names::GEOCODE,
            names::DISTANCE_MATRIX,
            names::DIRECTIONS,
        ],
        PlanningStage::FinalConfirmation | PlanningStage::Execution => &[],
    }
}

pub fn extraction_prompt() -> &'static str {
    EXTRACTION_PROMPT
}

pub fn extraction_request(text: &str) -> String {
    format!(
        "Extract the business travel requirement from this text and return JSON:\n\n{}",
        text
    )
}
