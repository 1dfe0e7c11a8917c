//! Intent classification via the Gemini generateContent API
//!
//! The classifier turns a free-text message plus the caller's current
//! activities into one JSON intent object. Output is untrusted; parsing
//! and shape recovery happen here, semantic normalization in
//! [`super::intent`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::config::ServerConfig;
use crate::metrics::{CLASSIFY_DURATION, CLASSIFY_TOTAL};
use crate::store::types::{Activity, User};

/// Failure modes of a classifier call
#[derive(Debug)]
pub enum ClassifierError {
    /// Upstream quota or rate limit exhausted (HTTP 429)
    Quota,
    /// Transport-level failure (connect, timeout, body read)
    Request(String),
    /// Non-success API response other than quota
    Api { status: u16, body: String },
}

impl std::fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierError::Quota => write!(f, "classifier quota exhausted"),
            ClassifierError::Request(msg) => write!(f, "classifier request failed: {}", msg),
            ClassifierError::Api { status, body } => {
                write!(f, "classifier API error {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for ClassifierError {}

/// Seam for intent classification. The production implementation calls
/// Gemini; tests script canned outputs.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        message: &str,
        user: &User,
        tasks: &[Activity],
    ) -> Result<Value, ClassifierError>;
}

/// Request format for the generateContent API
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

/// Response format from the generateContent API
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Gemini-backed classifier
pub struct GeminiClassifier {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClassifier {
    /// Build from server config. Needs `GEMINI_API_KEY` in the environment.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let api_key = std::env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY not set (required for the assistant)")?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.classifier_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.classifier_url.clone(),
            model: config.classifier_model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl IntentClassifier for GeminiClassifier {
    async fn classify(
        &self,
        message: &str,
        user: &User,
        tasks: &[Activity],
    ) -> Result<Value, ClassifierError> {
        let prompt = build_prompt(message, user, tasks);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLASSIFY_TOTAL.with_label_values(&["error"]).inc();
                ClassifierError::Request(e.to_string())
            })?;
        CLASSIFY_DURATION.observe(start.elapsed().as_secs_f64());

        let status = response.status();

        if status.as_u16() == 429 {
            CLASSIFY_TOTAL.with_label_values(&["quota"]).inc();
            tracing::warn!("Classifier quota exhausted");
            return Err(ClassifierError::Quota);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            CLASSIFY_TOTAL.with_label_values(&["error"]).inc();
            tracing::error!(status = status.as_u16(), "Classifier API error");
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            CLASSIFY_TOTAL.with_label_values(&["error"]).inc();
            ClassifierError::Request(format!("failed to parse response: {}", e))
        })?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default();

        CLASSIFY_TOTAL.with_label_values(&["ok"]).inc();

        match extract_json(&text) {
            Some(value) => Ok(value),
            None => {
                // Model ignored the JSON-only instruction; keep the text
                // as a chat reply instead of failing the request
                tracing::warn!("Classifier output had no parseable JSON, treating as chat");
                Ok(json!({
                    "action": "CHAT",
                    "reply": text.trim(),
                }))
            }
        }
    }
}

/// Build the classification prompt: caller profile, current activities
/// with their ids, the seven action formats, and the message itself.
pub(crate) fn build_prompt(message: &str, user: &User, tasks: &[Activity]) -> String {
    let activity_lines = tasks
        .iter()
        .map(|task| {
            format!(
                "ID: {} | Title: \"{}\" | Status: {} | Priority: {}",
                task.id,
                task.title,
                task.status.label(),
                task.priority
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are the assistant for a personal productivity platform.

You can help with:
- Creating new activities/tasks
- Editing existing activities
- Finding specific activities
- Listing all activities
- Marking activities as complete/incomplete
- Deleting activities
- Activity planning and organization

You cannot answer questions unrelated to activity management.
If the question is NOT related to activity management, reply:
"I can only help with activity management related questions."

User details:
Name: {name}
Email: {email}
Account created: {created}
Total activities: {total}

User current activities (with IDs for editing/deleting):
{activities}

Available actions:
1. CREATE_TASK - Create new activity
2. EDIT_TASK - Edit existing activity
3. DELETE_TASK - Delete activity
4. LIST_TASKS - Show all activities
5. FIND_TASK - Find specific activity
6. TOGGLE_COMPLETE - Mark activity complete/incomplete
7. CHAT - General activity advice

Response formats:

For normal chat:
{{
  "action": "CHAT",
  "reply": "your helpful response here"
}}

For creating an activity:
{{
  "action": "CREATE_TASK",
  "task": {{
    "title": "Clear activity title",
    "description": "Detailed description",
    "improvedText": "Rewritten in clear English",
    "priority": "High | Medium | Low",
    "steps": [{{ "step": "Action step" }}],
    "timeEstimate": "Time estimate (e.g., '2 hours')",
    "dueDate": "YYYY-MM-DD format",
    "completed": false
  }}
}}

For editing an activity:
{{
  "action": "EDIT_TASK",
  "taskId": "exact activity ID from the list above",
  "updates": {{
    "title": "new title if changed",
    "description": "new description if changed",
    "priority": "High | Medium | Low if changed",
    "dueDate": "YYYY-MM-DD if changed"
  }}
}}

For deleting an activity:
{{
  "action": "DELETE_TASK",
  "taskId": "exact activity ID from the list above"
}}

For listing activities:
{{
  "action": "LIST_TASKS",
  "filter": "all | completed | pending"
}}

For finding an activity:
{{
  "action": "FIND_TASK",
  "searchQuery": "search terms or activity title"
}}

For toggling completion:
{{
  "action": "TOGGLE_COMPLETE",
  "taskId": "exact activity ID from the list above"
}}

Rules:
- Always respond in VALID JSON only
- Do NOT add explanations or markdown
- Use activity IDs from the list above when editing/deleting
- When the user names an activity, resolve it to the closest matching ID from the list
- If multiple activities match, ask the user to be more specific

User message:
"{message}"
"#,
        name = user.name,
        email = user.email,
        created = user.created_at.format("%B %d, %Y"),
        total = tasks.len(),
        activities = activity_lines,
        message = message,
    )
}

/// Extract the first JSON object from potentially messy model output.
///
/// Strips markdown code fences, then scans for a balanced `{...}` while
/// tracking string literals so braces inside reply text do not truncate
/// the object.
pub(crate) fn extract_json(output: &str) -> Option<Value> {
    let cleaned = output
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let start = cleaned.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in cleaned[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &cleaned[start..start + i + 1];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }

    None
}
