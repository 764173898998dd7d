//! Tools offered to the language model during a planning conversation

pub mod maps;
pub mod planning;
pub mod tool;

pub use maps::{DirectionsTool, DistanceMatrixTool, GeocodeTool, SearchPlacesTool};
pub use planning::{ExtractRequirementTool, GenerateInitialPlanTool, ModifyPlanTool, ValidatePlanTool};
pub use tool::{Tool, ToolContext, ToolRegistry};

/// Function names as seen by the language model
pub mod names {
    pub const GEOCODE: &str = "geocode";
    pub const SEARCH_PLACES: &str = "search_places";
    pub const DISTANCE_MATRIX: &str = "distance_matrix";
    pub const DIRECTIONS: &str = "directions";
    pub const EXTRACT_TRAVEL_REQUIREMENT: &str = "extract_travel_requirement";
    pub const GENERATE_INITIAL_PLAN: &str = "generate_initial_plan";
    pub const MODIFY_PLAN: &str = "modify_plan";
    pub const VALIDATE_PLAN: &str = "validate_plan";
}

impl ToolRegistry {
    /// Registry with every planner tool
    pub fn with_planner_tools() -> Self {
        let mut registry = ToolRegistry::new();
        registry.register(GeocodeTool);
        registry.register(SearchPlacesTool);
        registry.register(DistanceMatrixTool);
        registry.register(DirectionsTool);
        registry.register(ExtractRequirementTool);
        registry.register(GenerateInitialPlanTool);
        registry.register(ModifyPlanTool);
        registry.register(ValidatePlanTool);
        registry
    }
}
