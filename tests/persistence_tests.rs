//! Storage durability tests.
//!
//! Every store is written, dropped, and reopened against the same directory
//! to prove that what the handlers rely on (secondary indexes included)
//! actually lives in RocksDB rather than in process memory.
//!
//! Run with: `cargo test --test persistence_tests`

use tempfile::TempDir;

use stride::store::types::{Activity, SupportCategory, SupportPriority, SupportRequest, TurnRole, User};
use stride::store::{ConversationStore, SupportStore, TaskStore, UserStore};
use stride::uuid::Uuid;

fn user_id() -> String {
    Uuid::new_v4().to_string()
}

#[test]
fn test_tasks_and_owner_index_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let owner = user_id();
    let task_id;

    {
        let store = TaskStore::new(dir.path()).unwrap();
        let task = Activity::new(owner.clone(), "Persist me".to_string(), "desc".to_string());
        task_id = task.id.to_string();
        store.store_task(&task).unwrap();
        store.flush().unwrap();
    }

    {
        let store = TaskStore::new(dir.path()).unwrap();
        let task = store.get_task(&owner, &task_id).unwrap().unwrap();
        assert_eq!(task.title, "Persist me");
        assert_eq!(store.owner_of(&task_id).unwrap().as_deref(), Some(owner.as_str()));
    }
}

#[test]
fn test_email_index_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let id;

    {
        let store = UserStore::new(dir.path()).unwrap();
        let user = User::new(
            "Asha".to_string(),
            "Asha@Example.com".to_string(),
            "hash".to_string(),
        );
        id = user.id.clone();
        store.create(&user).unwrap();
        store.flush().unwrap();
    }

    {
        let store = UserStore::new(dir.path()).unwrap();
        // Lookup is case-insensitive on the reopened index
        let found = store.get_by_email("asha@example.com").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(store.count(), 1);
    }
}

#[test]
fn test_completion_counter_and_level_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let id;

    {
        let store = UserStore::new(dir.path()).unwrap();
        let mut user = User::new(
            "Asha".to_string(),
            "asha@example.com".to_string(),
            "hash".to_string(),
        );
        user.tasks_completed = 99;
        id = user.id.clone();
        store.create(&user).unwrap();

        let outcome = store.record_completion(&id).unwrap();
        assert_eq!(outcome.tasks_completed, 100);
        assert_eq!(outcome.level, 1);
        assert!(outcome.leveled_up);

        store.flush().unwrap();
    }

    {
        let store = UserStore::new(dir.path()).unwrap();
        let user = store.get(&id).unwrap().unwrap();
        assert_eq!(user.tasks_completed, 100);
        assert_eq!(user.level, 1);

        // Reverting drops below the threshold again
        let outcome = store.revert_completion(&id).unwrap();
        assert_eq!(outcome.tasks_completed, 99);
        assert_eq!(outcome.level, 0);
    }
}

#[test]
fn test_conversation_order_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let owner = user_id();

    {
        let store = ConversationStore::new(dir.path()).unwrap();
        store
            .append_turn(&owner, TurnRole::User, "first".to_string())
            .unwrap();
        store
            .append_turn(&owner, TurnRole::Assistant, "second".to_string())
            .unwrap();
        store
            .append_turn(&owner, TurnRole::User, "third".to_string())
            .unwrap();
        store.flush().unwrap();
    }

    {
        let store = ConversationStore::new(dir.path()).unwrap();
        let turns = store.get_history(&owner).unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Assistant);
    }
}

#[test]
fn test_task_cascade_delete_clears_both_key_families() {
    let dir = TempDir::new().unwrap();
    let owner = user_id();
    let other = user_id();
    let owned_id;
    let other_id;

    {
        let store = TaskStore::new(dir.path()).unwrap();
        let a = Activity::new(owner.clone(), "A".to_string(), String::new());
        let b = Activity::new(owner.clone(), "B".to_string(), String::new());
        let c = Activity::new(other.clone(), "C".to_string(), String::new());
        owned_id = a.id.to_string();
        other_id = c.id.to_string();
        store.store_task(&a).unwrap();
        store.store_task(&b).unwrap();
        store.store_task(&c).unwrap();

        assert_eq!(store.delete_all_for_user(&owner).unwrap(), 2);
        store.flush().unwrap();
    }

    {
        let store = TaskStore::new(dir.path()).unwrap();
        assert!(store.list_tasks(&owner, None).unwrap().is_empty());
        assert!(store.owner_of(&owned_id).unwrap().is_none());

        // Unrelated user's data is untouched
        assert_eq!(store.list_tasks(&other, None).unwrap().len(), 1);
        assert_eq!(store.owner_of(&other_id).unwrap().as_deref(), Some(other.as_str()));
    }
}

#[test]
fn test_support_requests_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let owner = user_id();

    {
        let store = SupportStore::new(dir.path()).unwrap();
        let request = SupportRequest::new(
            owner.clone(),
            "Sync issue".to_string(),
            "tasks vanish".to_string(),
            SupportCategory::Bug,
            SupportPriority::High,
        );
        store.create(&request).unwrap();
        store.flush().unwrap();
    }

    {
        let store = SupportStore::new(dir.path()).unwrap();
        let requests = store.list_for_user(&owner).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].subject, "Sync issue");
        assert_eq!(requests[0].category, SupportCategory::Bug);
    }
}
