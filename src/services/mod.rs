//! Collaborators behind traits: maps lookups, the language model, report rendering and
//! persistence.

pub mod maps_client;
pub mod openai_client;
pub mod report;
pub mod store;

pub use maps_client::{
    DirectionsRequest, GoogleMapsClient, MapsProvider, MatrixRequest, PlaceQuery,
};
pub use openai_client::{
    parse_chat_reply, ChatReply, ChatRequest, ChatRole, ChatTurn, LanguageModel, OpenAIClient,
};
pub use report::{MarkdownReportFormatter, ReportFormatter};
pub use store::{
    ConversationStore, ConversationSummary, InMemoryConversationStore, InMemoryPlanStore,
    JsonFilePlanStore, PlanStore, PlanSummary, StoredPlan,
};
