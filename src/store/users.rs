//! Account storage with a case-insensitive email uniqueness index

use anyhow::{anyhow, Context, Result};
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

use super::types::User;
use crate::leveling;

/// Outcome of recording a completed activity for a user
#[derive(Debug, Clone, Copy)]
pub struct CompletionOutcome {
    pub tasks_completed: u64,
    pub level: u32,
    pub leveled_up: bool,
}

/// Storage for registered accounts.
///
/// Key shapes in one DB:
/// - `{user_id}` -> User JSON
/// - `email:{lowercased_email}` -> user id (uniqueness index)
pub struct UserStore {
    db: Arc<DB>,
}

impl UserStore {
    /// Open the user store under the given path
    pub fn new(storage_path: &Path) -> Result<Self> {
        let path = storage_path.join("users");
        std::fs::create_dir_all(&path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_max_write_buffer_number(2);
        opts.set_write_buffer_size(32 * 1024 * 1024); // 32MB

        let db = Arc::new(DB::open(&opts, &path).context("Failed to open users DB")?);

        tracing::info!("User store initialized");

        Ok(Self { db })
    }

    fn email_key(email: &str) -> String {
        format!("email:{}", email.trim().to_lowercase())
    }

    /// Create a new account. Fails when the email is already registered
    /// (case-insensitive).
    pub fn create(&self, user: &User) -> Result<()> {
        let email_key = Self::email_key(&user.email);

        if self.db.get(email_key.as_bytes())?.is_some() {
            return Err(anyhow!("email already registered: {}", user.email));
        }

        let value = serde_json::to_vec(user).context("Failed to serialize user")?;

        let mut batch = WriteBatch::default();
        batch.put(user.id.as_bytes(), &value);
        batch.put(email_key.as_bytes(), user.id.as_bytes());

        self.db.write(batch).context("Failed to store user")?;

        crate::metrics::record_store_op("users", "create", "success");
        tracing::debug!(user_id = %user.id, "Created user");

        Ok(())
    }

    /// Get a user by id
    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        match self.db.get(user_id.as_bytes())? {
            Some(value) => {
                let user: User =
                    serde_json::from_slice(&value).context("Failed to deserialize user")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Look a user up by email, case-insensitive
    pub fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let email_key = Self::email_key(email);

        match self.db.get(email_key.as_bytes())? {
            Some(id_bytes) => {
                let user_id = String::from_utf8_lossy(&id_bytes).to_string();
                self.get(&user_id)
            }
            None => Ok(None),
        }
    }

    /// Overwrite an existing user record. The email index is not touched;
    /// email addresses are immutable after registration.
    pub fn update(&self, user: &User) -> Result<()> {
        let value = serde_json::to_vec(user).context("Failed to serialize user")?;

        self.db
            .put(user.id.as_bytes(), &value)
            .context("Failed to update user")?;

        crate::metrics::record_store_op("users", "put", "success");

        Ok(())
    }

    /// Delete a user and their email index entry.
    /// Returns false when the user did not exist.
    pub fn delete(&self, user_id: &str) -> Result<bool> {
        let user = match self.get(user_id)? {
            Some(u) => u,
            None => return Ok(false),
        };

        let mut batch = WriteBatch::default();
        batch.delete(user_id.as_bytes());
        batch.delete(Self::email_key(&user.email).as_bytes());

        self.db.write(batch).context("Failed to delete user")?;

        crate::metrics::record_store_op("users", "delete", "success");
        tracing::debug!(user_id = %user_id, "Deleted user");

        Ok(true)
    }

    /// Record one completed activity: bump the counter, recompute the level.
    /// Returns the updated counter and whether the user crossed a threshold.
    pub fn record_completion(&self, user_id: &str) -> Result<CompletionOutcome> {
        let mut user = self
            .get(user_id)?
            .ok_or_else(|| anyhow!("user not found: {}", user_id))?;

        user.tasks_completed += 1;

        let previous_level = user.level;
        let (new_level, _title) = leveling::level_for(user.tasks_completed);
        user.level = new_level;

        self.update(&user)?;

        let outcome = CompletionOutcome {
            tasks_completed: user.tasks_completed,
            level: new_level,
            leveled_up: new_level > previous_level,
        };

        tracing::debug!(
            user_id = %user_id,
            tasks_completed = outcome.tasks_completed,
            level = outcome.level,
            leveled_up = outcome.leveled_up,
            "Recorded completion"
        );

        Ok(outcome)
    }

    /// Undo one recorded completion when an activity is reopened: drop the
    /// counter (never below zero) and recompute the level.
    pub fn revert_completion(&self, user_id: &str) -> Result<CompletionOutcome> {
        let mut user = self
            .get(user_id)?
            .ok_or_else(|| anyhow!("user not found: {}", user_id))?;

        user.tasks_completed = user.tasks_completed.saturating_sub(1);

        let (new_level, _title) = leveling::level_for(user.tasks_completed);
        user.level = new_level;

        self.update(&user)?;

        let outcome = CompletionOutcome {
            tasks_completed: user.tasks_completed,
            level: new_level,
            leveled_up: false,
        };

        tracing::debug!(
            user_id = %user_id,
            tasks_completed = outcome.tasks_completed,
            level = outcome.level,
            "Reverted completion"
        );

        Ok(outcome)
    }

    /// How many accounts exist (email index entries are skipped)
    pub fn count(&self) -> usize {
        self.db
            .iterator(rocksdb::IteratorMode::Start)
            .flatten()
            .filter(|(key, _)| !key.starts_with(b"email:"))
            .count()
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("Failed to flush users DB")?;
        Ok(())
    }
}
