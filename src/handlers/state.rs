//! Application state shared across handlers
//!
//! One [`AppContext`] owns every store plus the intent classifier. It is
//! built once at startup and handed to axum as `Arc<AppContext>`.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::assistant::{GeminiClassifier, IntentClassifier};
use crate::config::ServerConfig;
use crate::store::{ConversationStore, SupportStore, TaskStore, UserStore};

/// Shared handler state
pub type AppState = Arc<AppContext>;

pub struct AppContext {
    /// Activity storage
    pub task_store: Arc<TaskStore>,

    /// Account storage with the email uniqueness index
    pub user_store: Arc<UserStore>,

    /// Per-user conversation logs
    pub conversation_store: Arc<ConversationStore>,

    /// Support requests
    pub support_store: Arc<SupportStore>,

    /// Intent classifier behind a trait so tests can script outputs
    pub classifier: Arc<dyn IntentClassifier>,

    /// Server configuration
    pub server_config: ServerConfig,

    /// Base storage path
    pub base_path: PathBuf,

    /// Process start, for uptime reporting
    pub start_time: Instant,
}

impl AppContext {
    /// Open all stores and wire up the Gemini classifier.
    pub fn new(base_path: PathBuf, server_config: ServerConfig) -> Result<Self> {
        let classifier: Arc<dyn IntentClassifier> =
            Arc::new(GeminiClassifier::from_config(&server_config)?);
        Self::with_classifier(base_path, server_config, classifier)
    }

    /// Open all stores with a caller-supplied classifier.
    pub fn with_classifier(
        base_path: PathBuf,
        server_config: ServerConfig,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&base_path)?;

        let task_store = Arc::new(TaskStore::new(&base_path)?);
        let user_store = Arc::new(UserStore::new(&base_path)?);
        let conversation_store = Arc::new(ConversationStore::new(&base_path)?);
        let support_store = Arc::new(SupportStore::new(&base_path)?);

        info!(path = %base_path.display(), "Application state initialized");

        Ok(Self {
            task_store,
            user_store,
            conversation_store,
            support_store,
            classifier,
            server_config,
            base_path,
            start_time: Instant::now(),
        })
    }

    /// Flush every store to disk. Failures are logged, not fatal.
    pub fn flush_all(&self) -> Result<()> {
        info!("Flushing all databases to disk...");

        if let Err(e) = self.task_store.flush() {
            tracing::warn!("  Failed to flush task store: {}", e);
        }
        if let Err(e) = self.user_store.flush() {
            tracing::warn!("  Failed to flush user store: {}", e);
        }
        if let Err(e) = self.conversation_store.flush() {
            tracing::warn!("  Failed to flush conversation store: {}", e);
        }
        if let Err(e) = self.support_store.flush() {
            tracing::warn!("  Failed to flush support store: {}", e);
        }

        info!("All databases flushed: tasks, users, conversations, support");
        Ok(())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
