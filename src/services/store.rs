//! Conversation and plan persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::conversation::{Conversation, PlanningStage};
use crate::error::{PlannerError, Result};
use crate::types::Plan;
use crate::workflow::itinerary::Itinerary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub user_id: Option<String>,
    pub stage: PlanningStage,
    pub message_count: usize,
    pub has_plan: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            user_id: conversation.user_id.clone(),
            stage: conversation.stage,
            message_count: conversation.messages.len(),
            has_plan: conversation.current_plan.is_some(),
            updated_at: conversation.updated_at,
        }
    }
}

/// Keyed storage of live conversations
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Conversation>>;
    async fn put(&self, conversation: &Conversation) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Most recently updated first
    async fn list(&self) -> Result<Vec<ConversationSummary>>;
}

/// An executed plan with its rendered report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPlan {
    pub plan: Plan,
    pub markdown: String,
    pub itinerary: Itinerary,
    pub saved_at: DateTime<Utc>,
}

impl StoredPlan {
    pub fn new(plan: Plan, markdown: String, itinerary: Itinerary) -> Self {
        Self {
            plan,
            markdown,
            itinerary,
            saved_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.plan.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: String,
    pub title: String,
    pub version: u32,
    pub saved_at: DateTime<Utc>,
}

impl From<&StoredPlan> for PlanSummary {
    fn from(stored: &StoredPlan) -> Self {
        Self {
            id: stored.plan.id.clone(),
            title: stored.plan.title.clone(),
            version: stored.plan.version,
            saved_at: stored.saved_at,
        }
    }
}

/// Keyed storage of finished plans. A save replaces any plan with the same id.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn save(&self, plan: &StoredPlan) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<StoredPlan>>;
    /// Most recently saved first
    async fn list(&self) -> Result<Vec<PlanSummary>>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

fn lock_error(err: impl std::fmt::Display) -> PlannerError {
    PlannerError::Storage(err.to_string())
}

/// In-memory conversation store
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().map_err(lock_error)?;
        Ok(conversations.get(id).cloned())
    }

    async fn put(&self, conversation: &Conversation) -> Result<()> {
        let mut conversations = self.conversations.write().map_err(lock_error)?;
        conversations.insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut conversations = self.conversations.write().map_err(lock_error)?;
        Ok(conversations.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let conversations = self.conversations.read().map_err(lock_error)?;
        let mut summaries: Vec<ConversationSummary> =
            conversations.values().map(ConversationSummary::from).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

/// In-memory plan store
#[derive(Debug, Default)]
pub struct InMemoryPlanStore {
    plans: RwLock<HashMap<String, StoredPlan>>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn save(&self, plan: &StoredPlan) -> Result<()> {
        let mut plans = self.plans.write().map_err(lock_error)?;
        plans.insert(plan.id().to_string(), plan.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredPlan>> {
        let plans = self.plans.read().map_err(lock_error)?;
        Ok(plans.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<PlanSummary>> {
        let plans = self.plans.read().map_err(lock_error)?;
        let mut summaries: Vec<PlanSummary> = plans.values().map(PlanSummary::from).collect();
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut plans = self.plans.write().map_err(lock_error)?;
        Ok(plans.remove(id).is_some())
    }
}

/// Plan store keeping one `<id>.json` file per plan in a directory.
///
/// Saves write a temporary file and rename it over the target, so a reader never sees a
/// half-written plan.
#[derive(Debug, Clone)]
pub struct JsonFilePlanStore {
    dir: PathBuf,
}

impl JsonFilePlanStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|err| {
            PlannerError::Storage(format!("Cannot create {}: {err}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PlannerError::Validation(format!("Invalid plan id '{id}'")));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn read(path: &Path) -> Result<StoredPlan> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
            PlannerError::Storage(format!("Cannot read {}: {err}", path.display()))
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            PlannerError::Storage(format!(
                "Corrupt plan file {} at {}: {}",
                path.display(),
                err.path(),
                err.inner()
            ))
        })
    }
}

#[async_trait]
impl PlanStore for JsonFilePlanStore {
    async fn save(&self, plan: &StoredPlan) -> Result<()> {
        let path = self.path_for(plan.id())?;
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", plan.id(), uuid::Uuid::new_v4().simple()));
        let body = serde_json::to_vec_pretty(plan)?;

        let written = async {
            tokio::fs::write(&tmp, body).await?;
            tokio::fs::rename(&tmp, &path).await
        }
        .await;
        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(PlannerError::Storage(format!(
                "Cannot write plan to {}: {err}",
                path.display()
            )));
        }

        debug!(target: "trip_planner::store", "saved plan {} to {}", plan.id(), path.display());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredPlan>> {
        let path = self.path_for(id)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        Self::read(&path).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<PlanSummary>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|err| {
            PlannerError::Storage(format!("Cannot list {}: {err}", self.dir.display()))
        })?;

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| PlannerError::Storage(err.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path).await {
                Ok(stored) => summaries.push(PlanSummary::from(&stored)),
                Err(err) => warn!(target: "trip_planner::store", "skipping {}: {}", path.display(), err),
            }
        }
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(PlannerError::Storage(format!(
                "Cannot delete {}: {err}",
                path.display()
            ))),
        }
    }
}
