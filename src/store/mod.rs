//! Persistent storage layer
//!
//! Four RocksDB databases under one storage root:
//! - `users/`: accounts plus a case-insensitive email index
//! - `tasks/`: activities keyed `{user_id}:{activity_id}`
//! - `conversations/`: one transcript per user
//! - `support/`: support tickets keyed `{user_id}:{request_id}`

pub mod conversations;
pub mod support;
pub mod tasks;
pub mod types;
pub mod users;

pub use conversations::ConversationStore;
pub use support::SupportStore;
pub use tasks::TaskStore;
pub use types::*;
pub use users::{CompletionOutcome, UserStore};
