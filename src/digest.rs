//! Digest engine (C8): daily scoring, top-N selection, quiet-day logic,
//! and aggregate statistics, cached 24h per (user, date).

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use shared::cache::CacheKeys;
use shared::keywords::contains_otp;
use shared::models::{Category, Notification};
use shared::rules::rule_priority_boost;
use shared::Result;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::state::AppState;

const QUIET_DAY_MESSAGES: [&str; 4] = [
    "Nothing came through today — enjoy the quiet.",
    "Just one notification today. A calm one.",
    "A light day: two notifications came through.",
    "A quiet day overall, three notifications in total.",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopNotification {
    pub id: Uuid,
    pub app_name: String,
    pub title: String,
    pub category: Category,
    pub priority: i16,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DigestStatistics {
    pub received: i64,
    pub read: i64,
    pub dismissed: i64,
    pub acted_upon: i64,
    pub read_rate: f64,
    pub dismissal_rate: f64,
    pub most_active_app: Option<String>,
    pub most_active_hour: Option<u32>,
    pub app_breakdown: HashMap<String, i64>,
    pub hourly_breakdown: HashMap<u32, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDigest {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub total: i64,
    pub category_breakdown: HashMap<String, i64>,
    pub top_notifications: Vec<TopNotification>,
    pub statistics: DigestStatistics,
    pub is_quiet_day: bool,
    pub quiet_day_message: Option<String>,
    pub insights: Vec<String>,
}

/// Score used for top-N ranking (§4.8). Higher is more worth surfacing.
fn score_notification(n: &Notification, rule_priority_boost: f64, now: DateTime<Utc>) -> f64 {
    let mut score = match n.category {
        Category::Work => 3.0,
        Category::Personal => 2.0,
        Category::Junk => 0.5,
    };
    score += n.priority as f64;
    if !n.is_read {
        score += 1.0;
    }
    if contains_otp(&n.title, &n.body) || looks_security_related(&n.title, &n.body) {
        score += 10.0;
    }
    if now - n.created_at <= chrono::Duration::hours(2) {
        score += 0.5;
    }
    score += rule_priority_boost;
    score
}

fn looks_security_related(title: &str, body: &str) -> bool {
    let haystack = format!("{title} {body}").to_lowercase();
    ["security", "verification", "verify"].iter().any(|kw| haystack.contains(kw))
}

pub async fn get_daily_digest(
    state: &Arc<AppState>,
    user_id: Uuid,
    date: NaiveDate,
) -> Result<DailyDigest> {
    let cache_key = CacheKeys::daily_digest(user_id, &date.format("%Y-%m-%d").to_string());
    if let Ok(Some(cached)) = state.redis.get_json::<DailyDigest>(&cache_key).await {
        return Ok(cached);
    }

    let notifications = state.repos.notifications.list_for_user_on_date(user_id, date).await?;
    let active_rules = state.repos.user_rules.list_active_ordered(user_id).await?;
    let now = Utc::now();
    let quiet_threshold = state.config.app.quiet_day_threshold;
    let top_n = state.config.app.top_notifications.max(1);

    let total = notifications.len() as i64;
    let mut category_breakdown: HashMap<String, i64> = HashMap::new();
    let mut app_breakdown: HashMap<String, i64> = HashMap::new();
    let mut hourly_breakdown: HashMap<u32, i64> = HashMap::new();
    let mut read = 0i64;
    let mut dismissed = 0i64;

    let mut scored: Vec<TopNotification> = Vec::with_capacity(notifications.len());
    for n in &notifications {
        *category_breakdown.entry(n.category.as_str().to_string()).or_insert(0) += 1;
        *app_breakdown.entry(n.app_name.clone()).or_insert(0) += 1;
        *hourly_breakdown.entry(n.created_at.hour()).or_insert(0) += 1;
        if n.is_read {
            read += 1;
        }
        if n.is_dismissed {
            dismissed += 1;
        }
        let boost = rule_priority_boost(&n.app_name, &n.title, &n.body, &active_rules, now);
        let score = score_notification(n, boost, now);
        scored.push(TopNotification {
            id: n.id,
            app_name: n.app_name.clone(),
            title: n.title.clone(),
            category: n.category,
            priority: n.priority,
            score,
            created_at: n.created_at,
        });
    }

    // Sort by score desc, tiebreak by recency desc.
    scored.sort_by(|a, b| {
        b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(b.created_at.cmp(&a.created_at))
    });
    scored.truncate(top_n);

    let most_active_app =
        app_breakdown.iter().max_by_key(|(_, count)| **count).map(|(app, _)| app.clone());
    let most_active_hour =
        hourly_breakdown.iter().max_by_key(|(_, count)| **count).map(|(hour, _)| *hour);

    let acted_upon = notifications.iter().filter(|n| n.is_read || n.is_dismissed).count() as i64;
    let read_rate = if total > 0 { read as f64 / total as f64 } else { 0.0 };
    let dismissal_rate = if total > 0 { dismissed as f64 / total as f64 } else { 0.0 };

    let is_quiet_day = total <= quiet_threshold;
    let quiet_day_message = if is_quiet_day {
        let bucket = total.clamp(0, 3) as usize;
        Some(QUIET_DAY_MESSAGES[bucket].to_string())
    } else {
        None
    };

    let mut insights = Vec::new();
    if let Some(app) = &most_active_app {
        insights.push(format!("Most notifications today came from {app}."));
    }
    if read_rate < 0.3 && total > 0 {
        insights.push("Most of today's notifications remain unread.".to_string());
    }

    let digest = DailyDigest {
        user_id,
        date,
        total,
        category_breakdown,
        top_notifications: scored,
        statistics: DigestStatistics {
            received: total,
            read,
            dismissed,
            acted_upon,
            read_rate,
            dismissal_rate,
            most_active_app,
            most_active_hour,
            app_breakdown,
            hourly_breakdown,
        },
        is_quiet_day,
        quiet_day_message,
        insights,
    };

    let ttl = state.config.app.digest_cache_hours * 3600;
    if let Err(e) = state.redis.set_json(&cache_key, &digest, ttl).await {
        tracing::warn!(%user_id, "digest cache write failed: {e}");
    }

    Ok(digest)
}

pub async fn get_weekly_digest(state: &Arc<AppState>, user_id: Uuid) -> Result<Vec<DailyDigest>> {
    let today = Utc::now().date_naive();
    let mut days = Vec::with_capacity(7);
    for offset in 0..7 {
        let date = today - chrono::Duration::days(offset);
        days.push(get_daily_digest(state, user_id, date).await?);
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notification(category: Category, priority: i16, is_read: bool, title: &str, body: &str) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            source_device_id: Uuid::new_v4(),
            app_name: "TestApp".to_string(),
            title: title.to_string(),
            body: body.to_string(),
            category,
            priority,
            is_read,
            is_dismissed: false,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
            expires_at: Utc.with_ymd_and_hms(2026, 1, 8, 12, 0, 0).unwrap(),
            extras: None,
            client_id: None,
        }
    }

    #[test]
    fn scores_work_above_personal_above_junk() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();
        let work = notification(Category::Work, 0, true, "", "");
        let personal = notification(Category::Personal, 0, true, "", "");
        let junk = notification(Category::Junk, 0, true, "", "");
        assert!(score_notification(&work, 0.0, now) > score_notification(&personal, 0.0, now));
        assert!(score_notification(&personal, 0.0, now) > score_notification(&junk, 0.0, now));
    }

    #[test]
    fn unread_notifications_score_higher_than_read() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();
        let unread = notification(Category::Personal, 0, false, "", "");
        let read = notification(Category::Personal, 0, true, "", "");
        assert!(score_notification(&unread, 0.0, now) > score_notification(&read, 0.0, now));
    }

    #[test]
    fn otp_content_gets_large_score_bonus() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();
        let otp = notification(Category::Personal, 0, true, "Your OTP is 123456", "");
        let plain = notification(Category::Personal, 0, true, "Hello there", "");
        assert!(score_notification(&otp, 0.0, now) - score_notification(&plain, 0.0, now) >= 9.5);
    }

    #[test]
    fn security_keyword_detected_case_insensitively() {
        assert!(looks_security_related("Please Verify your account", ""));
        assert!(looks_security_related("", "SECURITY alert"));
        assert!(!looks_security_related("Lunch plans", "See you at noon"));
    }

    #[test]
    fn recent_notification_gets_recency_bonus() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let mut recent = notification(Category::Personal, 0, true, "", "");
        recent.created_at = created_at;
        let now_soon = created_at + chrono::Duration::minutes(30);
        let now_later = created_at + chrono::Duration::hours(5);
        assert!(score_notification(&recent, 0.0, now_soon) > score_notification(&recent, 0.0, now_later));
    }

    fn app_filter_rule(app_name: &str, action: shared::models::RuleAction) -> shared::models::UserRule {
        use shared::models::{RuleActionSpec, RuleConditions, RulePriority, RuleType, UserRule};
        UserRule {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "r".to_string(),
            rule_type: RuleType::AppFilter,
            priority: RulePriority::Medium,
            conditions: sqlx::types::Json(RuleConditions::AppFilter { app_names: vec![app_name.to_string()] }),
            actions: sqlx::types::Json(RuleActionSpec { action, category: None, priority: Some(3), highlight: None }),
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn prioritize_rule_boosts_digest_score_by_two() {
        use shared::models::RuleAction;
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();
        let rules = vec![app_filter_rule("Bank", RuleAction::Prioritize)];
        let boost = rule_priority_boost("Bank", "", "", &rules, now);
        assert_eq!(boost, 2.0);
    }

    #[test]
    fn mute_rule_lowers_digest_score_by_two() {
        use shared::models::RuleAction;
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();
        let rules = vec![app_filter_rule("ShopCo", RuleAction::Mute)];
        let boost = rule_priority_boost("ShopCo", "", "", &rules, now);
        assert_eq!(boost, -2.0);
    }

    #[test]
    fn no_matching_rule_gives_zero_boost() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();
        let rules = vec![app_filter_rule("Bank", shared::models::RuleAction::Prioritize)];
        let boost = rule_priority_boost("OtherApp", "", "", &rules, now);
        assert_eq!(boost, 0.0);
    }
}
