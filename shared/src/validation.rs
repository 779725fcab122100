//! Request-shape and domain validation plus sanitization for inbound
//! notifications (C1). Repositories never validate; this is the only place
//! that does.

use crate::error::AppError;
use crate::keywords::is_reserved_app_name;
use once_cell_compat::OnceLock;
use regex::Regex;

pub const MAX_APP_NAME_LEN: usize = 255;
pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_BODY_LEN: usize = 2000;

mod once_cell_compat {
    pub use std::sync::OnceLock;
}

const SCRIPT_PATTERNS: &[&str] = &["<script", "javascript:", "eval(", "document.cookie"];

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static ON_ATTR_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn on_attr_re() -> &'static Regex {
    ON_ATTR_RE.get_or_init(|| Regex::new(r"(?i)\bon\w+\s*=").unwrap())
}

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Raw, not-yet-sanitized shape of an inbound notification.
#[derive(Debug, Clone)]
pub struct NotificationInput {
    pub app_name: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub priority: Option<i16>,
}

/// Strips HTML-like tags, collapses whitespace, trims. Mutates in place.
pub fn sanitize_notification(input: &mut NotificationInput) {
    input.app_name = sanitize_string(&input.app_name);
    input.title = sanitize_string(&input.title);
    input.body = sanitize_string(&input.body);
}

fn sanitize_string(raw: &str) -> String {
    let without_tags = tag_re().replace_all(raw, "");
    let collapsed = whitespace_re().replace_all(&without_tags, " ");
    collapsed.trim().to_string()
}

fn contains_script_pattern(value: &str) -> bool {
    let lowered = value.to_lowercase();
    SCRIPT_PATTERNS.iter().any(|p| lowered.contains(p)) || on_attr_re().is_match(value)
}

/// Validates an already-sanitized input. Returns the first violation found.
pub fn validate_notification(input: &NotificationInput) -> Result<(), AppError> {
    if input.app_name.is_empty() {
        return Err(AppError::validation("app_name is required"));
    }
    if input.app_name.len() > MAX_APP_NAME_LEN {
        return Err(AppError::validation(format!(
            "app_name exceeds {MAX_APP_NAME_LEN} characters"
        )));
    }
    if input.title.len() > MAX_TITLE_LEN {
        return Err(AppError::validation(format!("title exceeds {MAX_TITLE_LEN} characters")));
    }
    if input.body.len() > MAX_BODY_LEN {
        return Err(AppError::validation(format!("body exceeds {MAX_BODY_LEN} characters")));
    }
    if input.title.is_empty() && input.body.is_empty() {
        return Err(AppError::validation("at least one of title or body is required"));
    }
    if is_reserved_app_name(&input.app_name) {
        return Err(AppError::validation(format!(
            "app_name '{}' is reserved",
            input.app_name
        )));
    }
    for field in [&input.app_name, &input.title, &input.body] {
        if contains_script_pattern(field) {
            return Err(AppError::validation("field contains disallowed script-like content"));
        }
    }
    if let Some(category) = &input.category {
        if !category.is_empty()
            && !["work", "personal", "junk"].contains(&category.to_lowercase().as_str())
        {
            return Err(AppError::validation(format!("invalid category '{category}'")));
        }
    }
    if let Some(priority) = input.priority {
        if !(0..=3).contains(&priority) {
            return Err(AppError::validation("priority must be within [0, 3]"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(app: &str, title: &str, body: &str) -> NotificationInput {
        NotificationInput {
            app_name: app.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            category: None,
            priority: None,
        }
    }

    #[test]
    fn sanitize_strips_tags_and_collapses_whitespace() {
        let mut n = input("Slack", "<b>Hello</b>   world", "  body  text ");
        sanitize_notification(&mut n);
        assert_eq!(n.title, "Hello world");
        assert_eq!(n.body, "body text");
    }

    #[test]
    fn rejects_both_title_and_body_empty() {
        let n = input("Slack", "", "");
        assert!(validate_notification(&n).is_err());
    }

    #[test]
    fn rejects_reserved_app_names() {
        let n = input("admin", "hi", "");
        assert!(validate_notification(&n).is_err());
    }

    #[test]
    fn app_name_at_255_accepted_at_256_rejected() {
        let ok = input(&"a".repeat(255), "x", "");
        assert!(validate_notification(&ok).is_ok());
        let bad = input(&"a".repeat(256), "x", "");
        assert!(validate_notification(&bad).is_err());
    }

    #[test]
    fn rejects_script_like_content() {
        let n = input("Slack", "<script>alert(1)</script>", "");
        // tag is stripped by sanitize first in real flow; validate directly
        // still catches unsanitized input used before the sanitize step.
        let raw = NotificationInput { title: "javascript:alert(1)".to_string(), ..n };
        assert!(validate_notification(&raw).is_err());
    }
}
