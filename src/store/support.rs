//! Support request storage

use anyhow::{Context, Result};
use rocksdb::{Options, DB};
use std::path::Path;
use std::sync::Arc;

use super::types::SupportRequest;

/// Storage for support tickets: key = {user_id}:{request_id}
pub struct SupportStore {
    db: Arc<DB>,
}

impl SupportStore {
    /// Open the support store under the given path
    pub fn new(storage_path: &Path) -> Result<Self> {
        let path = storage_path.join("support");
        std::fs::create_dir_all(&path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_max_write_buffer_number(2);
        opts.set_write_buffer_size(32 * 1024 * 1024); // 32MB

        let db = Arc::new(DB::open(&opts, &path).context("Failed to open support DB")?);

        tracing::info!("Support store initialized");

        Ok(Self { db })
    }

    /// Store a new support request
    pub fn create(&self, request: &SupportRequest) -> Result<()> {
        let key = format!("{}:{}", request.user_id, request.id);
        let value = serde_json::to_vec(request).context("Failed to serialize support request")?;

        self.db
            .put(key.as_bytes(), &value)
            .context("Failed to store support request")?;

        crate::metrics::record_store_op("support", "put", "success");
        tracing::debug!(
            request_id = %request.id,
            user_id = %request.user_id,
            category = ?request.category,
            "Stored support request"
        );

        Ok(())
    }

    /// A user's support requests, newest first
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<SupportRequest>> {
        let prefix = format!("{}:", user_id);
        let mut requests = Vec::new();

        let iter = self.db.prefix_iterator(prefix.as_bytes());

        for item in iter {
            let (key, value) = item?;
            let key_str = String::from_utf8_lossy(&key);

            if !key_str.starts_with(&prefix) {
                break;
            }

            let request: SupportRequest =
                serde_json::from_slice(&value).context("Failed to deserialize support request")?;
            requests.push(request);
        }

        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(requests)
    }

    /// Delete every request filed by a user. Returns how many were removed.
    pub fn delete_all_for_user(&self, user_id: &str) -> Result<usize> {
        let requests = self.list_for_user(user_id)?;
        let count = requests.len();

        for request in &requests {
            let key = format!("{}:{}", user_id, request.id);
            self.db
                .delete(key.as_bytes())
                .context("Failed to delete support request")?;
        }

        Ok(count)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("Failed to flush support DB")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::{SupportCategory, SupportPriority, SupportStatus};
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (SupportStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SupportStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_create_and_list() {
        let (store, _temp) = setup_store();

        let request = SupportRequest::new(
            "user-1".to_string(),
            "App crashes on login".to_string(),
            "Steps to reproduce attached".to_string(),
            SupportCategory::Bug,
            SupportPriority::High,
        );
        store.create(&request).unwrap();

        let listed = store.list_for_user("user-1").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].subject, "App crashes on login");
        assert_eq!(listed[0].status, SupportStatus::Open);
    }

    #[test]
    fn test_list_is_owner_scoped() {
        let (store, _temp) = setup_store();

        let mine = SupportRequest::new(
            "user-1".to_string(),
            "Mine".to_string(),
            String::new(),
            SupportCategory::General,
            SupportPriority::Medium,
        );
        let theirs = SupportRequest::new(
            "user-2".to_string(),
            "Theirs".to_string(),
            String::new(),
            SupportCategory::General,
            SupportPriority::Medium,
        );

        store.create(&mine).unwrap();
        store.create(&theirs).unwrap();

        let listed = store.list_for_user("user-1").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].subject, "Mine");
    }

    #[test]
    fn test_delete_all_for_user() {
        let (store, _temp) = setup_store();

        for i in 0..2 {
            let request = SupportRequest::new(
                "user-1".to_string(),
                format!("Request {}", i),
                String::new(),
                SupportCategory::General,
                SupportPriority::Low,
            );
            store.create(&request).unwrap();
        }

        assert_eq!(store.delete_all_for_user("user-1").unwrap(), 2);
        assert!(store.list_for_user("user-1").unwrap().is_empty());
    }
}
