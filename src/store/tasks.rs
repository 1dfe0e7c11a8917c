//! Activity storage and owner-scoped queries

use anyhow::{Context, Result};
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

use super::types::{Activity, StatusFilter};

/// Storage and query engine for activities
///
/// Two key families share one DB: `{user_id}:{activity_id}` holds the
/// activity itself, `owner:{activity_id}` maps an id back to its owner
/// so access checks can tell a foreign activity from a missing one.
/// User ids are UUIDs, so the `owner:` family never collides with a
/// per-user prefix.
pub struct TaskStore {
    db: Arc<DB>,
}

impl TaskStore {
    /// Create a new task store under the given path
    pub fn new(storage_path: &Path) -> Result<Self> {
        let path = storage_path.join("tasks");
        std::fs::create_dir_all(&path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_max_write_buffer_number(2);
        opts.set_write_buffer_size(32 * 1024 * 1024); // 32MB

        let db = Arc::new(DB::open(&opts, &path).context("Failed to open tasks DB")?);

        tracing::info!("Task store initialized");

        Ok(Self { db })
    }

    fn key(user_id: &str, task_id: &str) -> String {
        format!("{}:{}", user_id, task_id)
    }

    fn owner_key(task_id: &str) -> String {
        format!("owner:{}", task_id)
    }

    /// Store a new activity (or overwrite an existing one)
    pub fn store_task(&self, task: &Activity) -> Result<()> {
        let task_id = task.id.to_string();
        let key = Self::key(&task.user_id, &task_id);
        let value = serde_json::to_vec(task).context("Failed to serialize activity")?;

        let mut batch = WriteBatch::default();
        batch.put(key.as_bytes(), &value);
        batch.put(
            Self::owner_key(&task_id).as_bytes(),
            task.user_id.as_bytes(),
        );

        self.db.write(batch).context("Failed to store activity")?;

        crate::metrics::record_store_op("tasks", "put", "success");

        tracing::debug!(
            task_id = %task.id,
            user_id = %task.user_id,
            status = ?task.status,
            "Stored activity"
        );

        Ok(())
    }

    /// Get an activity by id, owner-scoped. An id owned by someone else
    /// resolves to `None` because the key embeds the owner.
    pub fn get_task(&self, user_id: &str, task_id: &str) -> Result<Option<Activity>> {
        let key = Self::key(user_id, task_id);

        match self.db.get(key.as_bytes())? {
            Some(value) => {
                let task: Activity =
                    serde_json::from_slice(&value).context("Failed to deserialize activity")?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Overwrite an existing activity
    pub fn update_task(&self, task: &Activity) -> Result<()> {
        self.store_task(task)
    }

    /// Look up who owns an activity id, regardless of caller.
    /// Distinguishes "someone else's activity" from "no such activity".
    pub fn owner_of(&self, task_id: &str) -> Result<Option<String>> {
        match self.db.get(Self::owner_key(task_id).as_bytes())? {
            Some(value) => Ok(Some(String::from_utf8_lossy(&value).into_owned())),
            None => Ok(None),
        }
    }

    /// Delete an activity. Returns false when it did not exist.
    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool> {
        let key = Self::key(user_id, task_id);

        if self.db.get(key.as_bytes())?.is_none() {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        batch.delete(key.as_bytes());
        batch.delete(Self::owner_key(task_id).as_bytes());

        self.db.write(batch).context("Failed to delete activity")?;

        crate::metrics::record_store_op("tasks", "delete", "success");
        tracing::debug!(task_id = %task_id, user_id = %user_id, "Deleted activity");

        Ok(true)
    }

    /// List a user's activities, newest first, with an optional
    /// completion filter.
    pub fn list_tasks(&self, user_id: &str, filter: Option<StatusFilter>) -> Result<Vec<Activity>> {
        let prefix = format!("{}:", user_id);
        let mut tasks = Vec::new();

        let iter = self.db.prefix_iterator(prefix.as_bytes());

        for item in iter {
            let (key, value) = item?;
            let key_str = String::from_utf8_lossy(&key);

            if !key_str.starts_with(&prefix) {
                break;
            }

            let task: Activity =
                serde_json::from_slice(&value).context("Failed to deserialize activity")?;

            match filter {
                Some(f) if !f.matches(task.status) => continue,
                _ => tasks.push(task),
            }
        }

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(tasks)
    }

    /// Case-insensitive substring search over title, description, and the
    /// assistant-refined description. Owner-scoped, newest first.
    pub fn search_tasks(&self, user_id: &str, query: &str) -> Result<Vec<Activity>> {
        let needle = query.to_lowercase();

        let mut matches: Vec<Activity> = self
            .list_tasks(user_id, None)?
            .into_iter()
            .filter(|task| {
                task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
                    || task
                        .improved_text
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matches)
    }

    /// Delete every activity owned by a user. Returns how many were removed.
    pub fn delete_all_for_user(&self, user_id: &str) -> Result<usize> {
        let tasks = self.list_tasks(user_id, None)?;
        let count = tasks.len();

        let mut batch = WriteBatch::default();
        for task in &tasks {
            let task_id = task.id.to_string();
            batch.delete(Self::key(user_id, &task_id).as_bytes());
            batch.delete(Self::owner_key(&task_id).as_bytes());
        }
        self.db
            .write(batch)
            .context("Failed to delete activities")?;

        if count > 0 {
            tracing::debug!(user_id = %user_id, count = count, "Deleted all activities for user");
        }

        Ok(count)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("Failed to flush tasks DB")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::{TaskPriority, TaskStatus};
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = TaskStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_store_and_get() {
        let (store, _temp) = setup_store();

        let task = Activity::new(
            "user-1".to_string(),
            "Buy groceries".to_string(),
            "Milk and eggs".to_string(),
        );
        store.store_task(&task).unwrap();

        let found = store.get_task("user-1", &task.id.to_string()).unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().title, "Buy groceries");
    }

    #[test]
    fn test_foreign_owner_resolves_to_none() {
        let (store, _temp) = setup_store();

        let task = Activity::new(
            "user-1".to_string(),
            "Private task".to_string(),
            String::new(),
        );
        store.store_task(&task).unwrap();

        let found = store.get_task("user-2", &task.id.to_string()).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let (store, _temp) = setup_store();

        let deleted = store.delete_task("user-1", "no-such-id").unwrap();
        assert!(!deleted);
    }

    #[test]
    fn test_owner_of_tracks_lifecycle() {
        let (store, _temp) = setup_store();

        let task = Activity::new("user-1".to_string(), "Mine".to_string(), String::new());
        let task_id = task.id.to_string();
        store.store_task(&task).unwrap();

        assert_eq!(store.owner_of(&task_id).unwrap().as_deref(), Some("user-1"));
        assert_eq!(store.owner_of("no-such-id").unwrap(), None);

        store.delete_task("user-1", &task_id).unwrap();
        assert_eq!(store.owner_of(&task_id).unwrap(), None);
    }

    #[test]
    fn test_list_with_filter() {
        let (store, _temp) = setup_store();

        let mut done = Activity::new("user-1".to_string(), "Done".to_string(), String::new());
        done.status = TaskStatus::Completed;
        let pending = Activity::new("user-1".to_string(), "Open".to_string(), String::new());

        store.store_task(&done).unwrap();
        store.store_task(&pending).unwrap();

        let all = store.list_tasks("user-1", None).unwrap();
        assert_eq!(all.len(), 2);

        let completed = store
            .list_tasks("user-1", Some(StatusFilter::Completed))
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].title, "Done");

        let open = store
            .list_tasks("user-1", Some(StatusFilter::Pending))
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].title, "Open");
    }

    #[test]
    fn test_list_is_owner_scoped_and_newest_first() {
        let (store, _temp) = setup_store();

        let mut first = Activity::new("user-1".to_string(), "First".to_string(), String::new());
        first.created_at = first.created_at - chrono::Duration::hours(1);
        let second = Activity::new("user-1".to_string(), "Second".to_string(), String::new());
        let other = Activity::new("user-2".to_string(), "Other".to_string(), String::new());

        store.store_task(&first).unwrap();
        store.store_task(&second).unwrap();
        store.store_task(&other).unwrap();

        let tasks = store.list_tasks("user-1", None).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Second");
        assert_eq!(tasks[1].title, "First");
    }

    #[test]
    fn test_search_matches_all_text_fields() {
        let (store, _temp) = setup_store();

        let mut by_title = Activity::new(
            "user-1".to_string(),
            "Workout plan".to_string(),
            String::new(),
        );
        by_title.priority = TaskPriority::High;

        let by_description = Activity::new(
            "user-1".to_string(),
            "Errands".to_string(),
            "gym membership renewal".to_string(),
        );

        let mut by_improved = Activity::new(
            "user-1".to_string(),
            "Misc".to_string(),
            String::new(),
        );
        by_improved.improved_text = Some("Stretch before the GYM session".to_string());

        let unrelated = Activity::new("user-1".to_string(), "Taxes".to_string(), String::new());

        store.store_task(&by_title).unwrap();
        store.store_task(&by_description).unwrap();
        store.store_task(&by_improved).unwrap();
        store.store_task(&unrelated).unwrap();

        let found = store.search_tasks("user-1", "gym").unwrap();
        assert_eq!(found.len(), 2);

        let found = store.search_tasks("user-1", "workout").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Workout plan");
    }

    #[test]
    fn test_delete_all_for_user() {
        let (store, _temp) = setup_store();

        for i in 0..3 {
            let task = Activity::new("user-1".to_string(), format!("Task {}", i), String::new());
            store.store_task(&task).unwrap();
        }
        let keep = Activity::new("user-2".to_string(), "Keep".to_string(), String::new());
        store.store_task(&keep).unwrap();

        let removed = store.delete_all_for_user("user-1").unwrap();
        assert_eq!(removed, 3);
        assert!(store.list_tasks("user-1", None).unwrap().is_empty());
        assert_eq!(store.list_tasks("user-2", None).unwrap().len(), 1);
    }
}
