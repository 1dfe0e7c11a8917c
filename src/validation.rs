//! Input validation for the REST surface
//!
//! All validators return `anyhow::Result` so handlers can map them onto
//! field-scoped API errors with `ValidationErrorExt`.

use anyhow::{anyhow, Result};

/// Maximum lengths for stored fields
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NAME_LENGTH: usize = 128;
pub const MAX_TITLE_LENGTH: usize = 512;
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;
pub const MAX_MESSAGE_LENGTH: usize = 10_000;
pub const MAX_STEP_LENGTH: usize = 1_000;
pub const MAX_STEPS_PER_TASK: usize = 100;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Validate a task id (UUID format)
pub fn validate_task_id(task_id: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(task_id).map_err(|e| anyhow!("Invalid task id: {e}"))
}

/// Validate an email address
///
/// Deliberately loose: one `@` with a dot somewhere after it. Deliverability
/// is not checked anywhere in this server, so a stricter grammar buys nothing.
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(anyhow!("email cannot be empty"));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(anyhow!(
            "email too long: {} chars (max: {})",
            email.len(),
            MAX_EMAIL_LENGTH
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(anyhow!("email must contain '@'"));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(anyhow!("email is not a valid address"));
    }

    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(anyhow!("email contains invalid characters"));
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(anyhow!(
            "password too short: {} chars (min: {})",
            password.len(),
            MIN_PASSWORD_LENGTH
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(anyhow!(
            "password too long: {} chars (max: {})",
            password.len(),
            MAX_PASSWORD_LENGTH
        ));
    }

    Ok(())
}

/// Validate a display name
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("name cannot be empty"));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(anyhow!(
            "name too long: {} chars (max: {})",
            name.len(),
            MAX_NAME_LENGTH
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(anyhow!("name contains invalid control characters"));
    }

    Ok(())
}

/// Validate an activity title
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(anyhow!("title cannot be empty"));
    }

    if title.len() > MAX_TITLE_LENGTH {
        return Err(anyhow!(
            "title too long: {} chars (max: {})",
            title.len(),
            MAX_TITLE_LENGTH
        ));
    }

    Ok(())
}

/// Validate free text (descriptions, time estimates, step text)
pub fn validate_text(text: &str, max: usize) -> Result<()> {
    if text.len() > max {
        return Err(anyhow!("text too long: {} chars (max: {})", text.len(), max));
    }

    Ok(())
}

/// Validate an inbound chat message
pub fn validate_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(anyhow!("message cannot be empty"));
    }

    if message.len() > MAX_MESSAGE_LENGTH {
        return Err(anyhow!(
            "message too long: {} chars (max: {})",
            message.len(),
            MAX_MESSAGE_LENGTH
        ));
    }

    Ok(())
}

/// Validate a step list coming from the direct task API
pub fn validate_steps(steps: &[String]) -> Result<()> {
    if steps.len() > MAX_STEPS_PER_TASK {
        return Err(anyhow!(
            "too many steps: {} (max: {})",
            steps.len(),
            MAX_STEPS_PER_TASK
        ));
    }

    for step in steps {
        validate_text(step, MAX_STEP_LENGTH)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b+tag@sub.domain.org").is_ok());
    }

    #[test]
    fn test_invalid_email() {
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("has space@example.com").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(300))).is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("12345").is_err()); // below minimum
        assert!(validate_password(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_task_id_is_uuid() {
        let id = uuid::Uuid::new_v4().to_string();
        assert!(validate_task_id(&id).is_ok());
        assert!(validate_task_id("not-a-uuid").is_err());
        assert!(validate_task_id("").is_err());
    }

    #[test]
    fn test_title() {
        assert!(validate_title("Buy groceries").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(600)).is_err());
    }

    #[test]
    fn test_message() {
        assert!(validate_message("list my tasks").is_ok());
        assert!(validate_message("").is_err());
        assert!(validate_message("   ").is_err());
        assert!(validate_message(&"m".repeat(20_000)).is_err());
    }

    #[test]
    fn test_steps() {
        let ok: Vec<String> = vec!["one".into(), "two".into()];
        assert!(validate_steps(&ok).is_ok());

        let too_many: Vec<String> = (0..200).map(|i| format!("step {i}")).collect();
        assert!(validate_steps(&too_many).is_err());
    }
}
