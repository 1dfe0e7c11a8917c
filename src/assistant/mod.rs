//! Conversational assistant: classification, normalization, dispatch
//!
//! A message travels classifier -> intent normalization -> dispatcher.
//! The dispatcher owns all store mutations and the conversation log;
//! handlers only translate its outcome into an HTTP response.

pub mod classifier;
pub mod dispatcher;
pub mod intent;

pub use classifier::{ClassifierError, GeminiClassifier, IntentClassifier};
pub use dispatcher::{AssistantResponse, DispatchOutcome, Dispatcher, ResponseData};
pub use intent::{classify_value, ClassifiedIntent, MalformedIntent, TaskDraft, TaskUpdates};
