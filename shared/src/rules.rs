//! Classification & rule engine (C5): deterministic and pure over
//! (rule set, notification, clock). Classification runs before rules so
//! rules may override it.

use crate::keywords::{contains_otp, is_promotional, is_work_app, looks_like_work_content};
use crate::models::{
    Category, KeywordFields, RuleAction, RuleConditions, RulePriority, RuleType, UserRule,
};
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Mutable working state for a notification as it passes through
/// classification and rule evaluation, before being persisted.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub app_name: String,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub priority: i16,
    pub highlighted: bool,
}

/// Auto-classification, applied only when the caller had no incoming
/// category (an explicit category from the client is never overridden by
/// this step — only by rule evaluation).
pub fn auto_classify(app_name: &str, title: &str, body: &str, priority: i16) -> (Category, i16) {
    if contains_otp(title, body) {
        return (Category::Personal, priority.max(2));
    }
    if is_promotional(title, body) {
        return (Category::Junk, priority);
    }
    if is_work_app(app_name) && looks_like_work_content(title, body) {
        return (Category::Work, priority);
    }
    (Category::Personal, priority)
}

/// Iterates `rules` in descending priority (ties broken by creation time,
/// older first — callers must pre-sort `rules` that way); the first match
/// wins and mutates `draft` in place.
pub fn apply_rules(draft: &mut NotificationDraft, rules: &[UserRule], now: DateTime<Utc>) {
    for rule in rules {
        if !rule.is_active {
            continue;
        }
        if rule_matches(rule, draft, now) {
            apply_action(draft, &rule.actions.0);
            break;
        }
    }
}

/// Sorts active rules by descending `RulePriority`, then by ascending
/// `created_at` (older first) to break ties, matching the conflict
/// resolution order the engine requires.
pub fn order_rules_for_evaluation(mut rules: Vec<UserRule>) -> Vec<UserRule> {
    rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
    rules
}

fn rule_matches(rule: &UserRule, draft: &NotificationDraft, now: DateTime<Utc>) -> bool {
    match &rule.conditions.0 {
        RuleConditions::AppFilter { app_names } => app_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&draft.app_name)),
        RuleConditions::KeywordFilter { keywords, case_sensitive, fields } => {
            let haystack = match fields {
                KeywordFields::Title => draft.title.clone(),
                KeywordFields::Body => draft.body.clone(),
                KeywordFields::Both => format!("{} {}", draft.title, draft.body),
            };
            keywords.iter().any(|kw| {
                if *case_sensitive {
                    haystack.contains(kw.as_str())
                } else {
                    haystack.to_lowercase().contains(&kw.to_lowercase())
                }
            })
        }
        RuleConditions::TimeBased { start_time, end_time, timezone, weekdays } => {
            time_based_matches(start_time, end_time, timezone.as_deref(), weekdays, now)
        }
        RuleConditions::OtpAlways {} => contains_otp(&draft.title, &draft.body),
        RuleConditions::PromoMute {} => is_promotional(&draft.title, &draft.body),
    }
}

fn time_based_matches(
    start_time: &str,
    end_time: &str,
    timezone: Option<&str>,
    weekdays: &Option<Vec<u8>>,
    now: DateTime<Utc>,
) -> bool {
    let local_now = match timezone.and_then(|tz| tz.parse::<chrono_tz::Tz>().ok()) {
        Some(tz) => now.with_timezone(&tz).naive_local(),
        None => now.naive_utc(),
    };

    if let Some(days) = weekdays {
        // chrono weekday: Mon=0..Sun=6; spec's weekday set is caller-defined,
        // so we accept whatever numbering the caller persisted.
        let weekday_num = local_now.weekday().num_days_from_monday() as u8;
        if !days.contains(&weekday_num) {
            return false;
        }
    }

    let (Ok(start), Ok(end)) = (parse_hm(start_time), parse_hm(end_time)) else {
        return false;
    };
    let current_minutes = local_now.hour() * 60 + local_now.minute();
    if start <= end {
        (start..=end).contains(&current_minutes)
    } else {
        // window wraps midnight
        current_minutes >= start || current_minutes <= end
    }
}

fn parse_hm(value: &str) -> Result<u32, ()> {
    let mut parts = value.splitn(2, ':');
    let h: u32 = parts.next().ok_or(())?.parse().map_err(|_| ())?;
    let m: u32 = parts.next().unwrap_or("0").parse().map_err(|_| ())?;
    Ok(h * 60 + m)
}

fn apply_action(draft: &mut NotificationDraft, action: &crate::models::RuleActionSpec) {
    match action.action {
        RuleAction::Categorize => {
            if let Some(category) = action.category {
                draft.category = category;
            }
        }
        RuleAction::Prioritize => {
            let target = action.priority.unwrap_or(3).min(3);
            draft.priority = draft.priority.max(target);
            if action.highlight.unwrap_or(false) {
                draft.highlighted = true;
            }
        }
        RuleAction::Mute => {
            draft.category = Category::Junk;
            draft.priority = 0;
        }
        RuleAction::Highlight => {
            draft.highlighted = true;
            let bump = action.priority.unwrap_or(1);
            draft.priority = (draft.priority + bump).min(3);
        }
    }
}

/// The digest engine's top-N score adjustment (§4.8: "priority_boost +2,
/// mute -2"): re-runs rule matching against the already-persisted
/// `app_name`/`title`/`body` and reads off the action of whichever rule
/// would win, without mutating anything. `rules` must already be ordered
/// (see `order_rules_for_evaluation`).
pub fn rule_priority_boost(app_name: &str, title: &str, body: &str, rules: &[UserRule], now: DateTime<Utc>) -> f64 {
    let draft = NotificationDraft {
        app_name: app_name.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        category: Category::Personal,
        priority: 0,
        highlighted: false,
    };
    for rule in rules {
        if !rule.is_active {
            continue;
        }
        if rule_matches(rule, &draft, now) {
            return match rule.actions.0.action {
                RuleAction::Prioritize => 2.0,
                RuleAction::Mute => -2.0,
                RuleAction::Categorize | RuleAction::Highlight => 0.0,
            };
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleActionSpec;
    use chrono::TimeZone;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn base_draft() -> NotificationDraft {
        NotificationDraft {
            app_name: "Bank".to_string(),
            title: "Your OTP is 123456".to_string(),
            body: String::new(),
            category: Category::Personal,
            priority: 0,
            highlighted: false,
        }
    }

    fn rule(
        rule_type: RuleType,
        priority: RulePriority,
        conditions: RuleConditions,
        action: RuleActionSpec,
        created_at: DateTime<Utc>,
    ) -> UserRule {
        UserRule {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "r".to_string(),
            rule_type,
            priority,
            conditions: Json(conditions),
            actions: Json(action),
            is_active: true,
            created_at,
        }
    }

    #[test]
    fn otp_auto_classification_bumps_priority() {
        let (category, priority) = auto_classify("Bank", "Your OTP is 123456", "", 0);
        assert_eq!(category, Category::Personal);
        assert!(priority >= 2);
    }

    #[test]
    fn promotional_auto_classification_is_junk() {
        let (category, _) = auto_classify("ShopCo", "50% off sale", "Buy now", 0);
        assert_eq!(category, Category::Junk);
    }

    #[test]
    fn critical_rule_wins_over_low_priority_matching_rule() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let critical = rule(
            RuleType::OtpAlways,
            RulePriority::Critical,
            RuleConditions::OtpAlways {},
            RuleActionSpec {
                action: RuleAction::Prioritize,
                category: None,
                priority: Some(3),
                highlight: Some(true),
            },
            now,
        );
        let low = rule(
            RuleType::AppFilter,
            RulePriority::Low,
            RuleConditions::AppFilter { app_names: vec!["Bank".to_string()] },
            RuleActionSpec {
                action: RuleAction::Categorize,
                category: Some(Category::Work),
                priority: None,
                highlight: None,
            },
            now,
        );
        let ordered = order_rules_for_evaluation(vec![low, critical]);
        let mut draft = base_draft();
        apply_rules(&mut draft, &ordered, now);
        assert_eq!(draft.category, Category::Personal);
        assert_eq!(draft.priority, 3);
        assert!(draft.highlighted);
    }

    #[test]
    fn rule_evaluation_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let rules = order_rules_for_evaluation(vec![rule(
            RuleType::PromoMute,
            RulePriority::Medium,
            RuleConditions::PromoMute {},
            RuleActionSpec { action: RuleAction::Mute, category: None, priority: None, highlight: None },
            now,
        )]);
        let mut a = NotificationDraft {
            app_name: "ShopCo".to_string(),
            title: "50% off".to_string(),
            body: String::new(),
            category: Category::Junk,
            priority: 1,
            highlighted: false,
        };
        let mut b = a.clone();
        apply_rules(&mut a, &rules, now);
        apply_rules(&mut b, &rules, now);
        assert_eq!(a.category, b.category);
        assert_eq!(a.priority, b.priority);
    }
}
