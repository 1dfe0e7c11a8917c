//! Per-user conversation transcripts
//!
//! One log per user, upsert-keyed by user id. Appends are serialized
//! per user so concurrent first-contact requests cannot create two logs
//! or lose turns to a read-modify-write race.

use anyhow::{Context, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use rocksdb::{Options, DB};
use std::path::Path;
use std::sync::Arc;

use super::types::{ConversationLog, Turn, TurnRole};

/// Storage for conversation logs: key = {user_id}
pub struct ConversationStore {
    db: Arc<DB>,

    /// Per-user append locks
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationStore {
    /// Open the conversation store under the given path
    pub fn new(storage_path: &Path) -> Result<Self> {
        let path = storage_path.join("conversations");
        std::fs::create_dir_all(&path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_max_write_buffer_number(2);
        opts.set_write_buffer_size(32 * 1024 * 1024); // 32MB

        let db = Arc::new(DB::open(&opts, &path).context("Failed to open conversations DB")?);

        tracing::info!("Conversation store initialized");

        Ok(Self {
            db,
            locks: DashMap::new(),
        })
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn load(&self, user_id: &str) -> Result<Option<ConversationLog>> {
        match self.db.get(user_id.as_bytes())? {
            Some(value) => {
                let log: ConversationLog = serde_json::from_slice(&value)
                    .context("Failed to deserialize conversation log")?;
                Ok(Some(log))
            }
            None => Ok(None),
        }
    }

    fn persist(&self, log: &ConversationLog) -> Result<()> {
        let value = serde_json::to_vec(log).context("Failed to serialize conversation log")?;

        self.db
            .put(log.user_id.as_bytes(), &value)
            .context("Failed to store conversation log")?;

        crate::metrics::record_store_op("conversations", "put", "success");

        Ok(())
    }

    /// Append one turn to the user's log, creating the log on first contact.
    /// Repeated calls append distinct turns; there is no dedup.
    pub fn append_turn(&self, user_id: &str, role: TurnRole, content: String) -> Result<()> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock();

        let mut log = self
            .load(user_id)?
            .unwrap_or_else(|| ConversationLog::new(user_id.to_string()));

        log.turns.push(Turn::new(role, content));

        self.persist(&log)?;

        tracing::debug!(
            user_id = %user_id,
            role = ?role,
            turns = log.turns.len(),
            "Appended turn"
        );

        Ok(())
    }

    /// All turns for a user in insertion order; empty when no log exists yet
    pub fn get_history(&self, user_id: &str) -> Result<Vec<Turn>> {
        Ok(self
            .load(user_id)?
            .map(|log| log.turns)
            .unwrap_or_default())
    }

    /// Drop a user's log entirely (account deletion).
    /// Returns false when no log existed.
    pub fn delete_for_user(&self, user_id: &str) -> Result<bool> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock();

        if self.db.get(user_id.as_bytes())?.is_none() {
            return Ok(false);
        }

        self.db
            .delete(user_id.as_bytes())
            .context("Failed to delete conversation log")?;

        self.locks.remove(user_id);

        Ok(true)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("Failed to flush conversations DB")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (ConversationStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ConversationStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_first_append_creates_log() {
        let (store, _temp) = setup_store();

        assert!(store.get_history("user-1").unwrap().is_empty());

        store
            .append_turn("user-1", TurnRole::User, "hello".to_string())
            .unwrap();

        let history = store.get_history("user-1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].content, "hello");
    }

    #[test]
    fn test_turns_keep_insertion_order() {
        let (store, _temp) = setup_store();

        store
            .append_turn("user-1", TurnRole::User, "first".to_string())
            .unwrap();
        store
            .append_turn("user-1", TurnRole::Assistant, "second".to_string())
            .unwrap();
        store
            .append_turn("user-1", TurnRole::User, "third".to_string())
            .unwrap();

        let history = store.get_history("user-1").unwrap();
        let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicate_content_is_not_deduped() {
        let (store, _temp) = setup_store();

        store
            .append_turn("user-1", TurnRole::User, "same".to_string())
            .unwrap();
        store
            .append_turn("user-1", TurnRole::User, "same".to_string())
            .unwrap();

        assert_eq!(store.get_history("user-1").unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_first_contact_single_log() {
        let (store, _temp) = setup_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .append_turn("user-1", TurnRole::User, format!("turn {}", i))
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // All appends land in one log; none are lost to a create race
        assert_eq!(store.get_history("user-1").unwrap().len(), 8);
    }

    #[test]
    fn test_delete_for_user() {
        let (store, _temp) = setup_store();

        store
            .append_turn("user-1", TurnRole::User, "hello".to_string())
            .unwrap();

        assert!(store.delete_for_user("user-1").unwrap());
        assert!(store.get_history("user-1").unwrap().is_empty());
        assert!(!store.delete_for_user("user-1").unwrap());
    }
}
