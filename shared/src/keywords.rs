//! Fixed, case-insensitive content-detection keyword sets and the heuristics
//! built on top of them. These lists are load-bearing and must not drift.

pub const OTP_KEYWORDS: &[&str] = &[
    "otp", "verification", "security", "login", "signin", "code",
    "authenticate", "verify", "2fa", "two-factor", "password",
];

pub const PROMOTIONAL_KEYWORDS: &[&str] = &[
    "sale", "discount", "offer", "deal", "promotion", "coupon",
    "limited time", "buy now", "shop", "% off", "unsubscribe",
    "marketing", "newsletter",
];

pub const WORK_APPS: &[&str] = &[
    "slack", "microsoft teams", "outlook", "gmail", "zoom", "webex",
    "skype", "calendar", "jira", "confluence", "trello", "asana",
    "notion", "monday", "salesforce",
];

pub const WORK_KEYWORDS: &[&str] = &[
    "meeting", "conference", "deadline", "project", "task", "client",
    "customer", "report", "presentation", "schedule", "appointment",
    "colleague", "team",
];

pub const RESERVED_APP_NAMES: &[&str] = &["system", "admin", "root", "notisync"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|n| haystack.contains(&n.to_lowercase()))
}

/// `ContainsOTP(n)`: case-insensitive scan over `title || body`.
pub fn contains_otp(title: &str, body: &str) -> bool {
    let combined = format!("{title} {body}");
    contains_any(&combined, OTP_KEYWORDS)
}

/// `IsPromotional(n)`: case-insensitive scan over `title || body`.
pub fn is_promotional(title: &str, body: &str) -> bool {
    let combined = format!("{title} {body}");
    contains_any(&combined, PROMOTIONAL_KEYWORDS)
}

/// Work-app allow-list match against `app_name`, used in conjunction with
/// `looks_like_work_content` for auto-classification.
pub fn is_work_app(app_name: &str) -> bool {
    let app_name = app_name.to_lowercase();
    WORK_APPS.iter().any(|a| app_name == a.to_lowercase() || app_name.contains(&a.to_lowercase()))
}

pub fn looks_like_work_content(title: &str, body: &str) -> bool {
    let combined = format!("{title} {body}");
    contains_any(&combined, WORK_KEYWORDS)
}

pub fn is_reserved_app_name(app_name: &str) -> bool {
    let lowered = app_name.trim().to_lowercase();
    RESERVED_APP_NAMES.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_otp_case_insensitively() {
        assert!(contains_otp("Your OTP is 123456", ""));
        assert!(contains_otp("", "please VERIFY your login"));
        assert!(!contains_otp("Team standup", "see you at 9am"));
    }

    #[test]
    fn detects_promotional_content() {
        assert!(is_promotional("50% off sale", "Buy now"));
        assert!(!is_promotional("Your OTP is 123456", ""));
    }

    #[test]
    fn matches_work_apps_case_insensitively() {
        assert!(is_work_app("Slack"));
        assert!(is_work_app("Microsoft Teams"));
        assert!(!is_work_app("ShopCo"));
    }

    #[test]
    fn rejects_reserved_app_names() {
        assert!(is_reserved_app_name("System"));
        assert!(is_reserved_app_name("NotiSync"));
        assert!(!is_reserved_app_name("Slack"));
    }
}
