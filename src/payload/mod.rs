//! Request assembly for the chat-messages endpoint.
//!
//! Everything here is a pure function of the agent config, the optional
//! conversation token and the user's text, except for the timestamp. The
//! `*_at` variants take the instant explicitly so callers (and tests) can
//! pin it.

use chrono::{DateTime, Datelike, FixedOffset, Local, SecondsFormat, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::types::{QuerySnapshot, RequestPayload, ResponseMode};

/// Task categories understood by the remote agent.
pub const TASK_CATEGORIES: [(u8, &str); 6] = [
    (1, "生活"),
    (2, "健康"),
    (3, "工作"),
    (4, "学习"),
    (5, "放松"),
    (6, "探索"),
];

/// Repetition frequencies understood by the remote agent.
pub const REPETITION_LABELS: [(u8, &str); 4] = [(0, "不重复"), (1, "每日"), (2, "每周"), (3, "每月")];

/// Stands in for the item summary when no candidate item recurs.
pub const NO_RECURRING_ITEMS: &str = "no recurring items";

const SECTION_SEPARATOR: &str = " | ";

fn legend(entries: &[(u8, &str)]) -> String {
    entries
        .iter()
        .map(|(value, label)| format!("{value}：{label}"))
        .collect::<Vec<_>>()
        .join("/")
}

/// `1：生活/2：健康/...`
pub fn category_legend() -> String {
    legend(&TASK_CATEGORIES)
}

/// `0：不重复/1：每日/...`
pub fn repetition_legend() -> String {
    legend(&REPETITION_LABELS)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_section(label: &str, map: &Map<String, Value>) -> Option<String> {
    let entries: Vec<String> = map
        .iter()
        .filter(|(_, v)| !is_blank(v))
        .map(|(k, v)| format!("{k}={}", render_scalar(v)))
        .collect();
    if entries.is_empty() {
        None
    } else {
        Some(format!("{label}: {}", entries.join("; ")))
    }
}

/// Category legend followed by the non-empty behavioral pattern and insight
/// hints.
pub fn build_category_string(config: &AgentConfig) -> String {
    let mut sections = vec![category_legend()];
    sections.extend(render_section(
        "behavioral_patterns",
        &config.behavioral_patterns,
    ));
    sections.extend(render_section("insight", &config.insight));
    sections.join(SECTION_SEPARATOR)
}

fn repetition_label(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let n = n.as_u64()?;
            if n == 0 {
                return None;
            }
            let label = REPETITION_LABELS
                .iter()
                .find(|(v, _)| u64::from(*v) == n)
                .map(|(_, label)| (*label).to_string())
                .unwrap_or_else(|| n.to_string());
            Some(label)
        }
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s != "0").then(|| s.to_string())
        }
        _ => None,
    }
}

fn item_title(item: &Value, index: usize) -> String {
    ["title", "name", "content", "description"]
        .iter()
        .find_map(|key| item.get(key).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| format!("#{}", index + 1))
}

/// Repetition legend followed by the recurring candidate items, or
/// [`NO_RECURRING_ITEMS`] when none recur.
pub fn build_repetition_string(config: &AgentConfig) -> String {
    let recurring: Vec<String> = config
        .candidate_items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let label = item.get("repetition").and_then(repetition_label)?;
            Some(format!("{}={label}", item_title(item, idx)))
        })
        .collect();

    let summary = if recurring.is_empty() {
        NO_RECURRING_ITEMS.to_string()
    } else {
        recurring.join(", ")
    };
    format!("{}{SECTION_SEPARATOR}{summary}", repetition_legend())
}

/// `at` expressed in the named IANA zone. Unknown zones fall back to the
/// host's local offset.
pub fn localize(timezone: &str, at: DateTime<Utc>) -> DateTime<FixedOffset> {
    match timezone.parse::<Tz>() {
        Ok(tz) => at.with_timezone(&tz).fixed_offset(),
        Err(_) => {
            warn!(timezone, "unknown timezone, using host local time");
            at.with_timezone(&Local).fixed_offset()
        }
    }
}

/// ISO-8601 timestamp with explicit offset for `at` in `timezone`.
pub fn nowtime_at(timezone: &str, at: DateTime<Utc>) -> String {
    localize(timezone, at).to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Current time in `timezone`, e.g. `2024-05-01T09:30:00.123456+08:00`.
pub fn build_nowtime(timezone: &str) -> String {
    nowtime_at(timezone, Utc::now())
}

fn time_of_day(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=20 => "evening",
        _ => "night",
    }
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// Northern hemisphere.
fn season(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "winter",
        3..=5 => "spring",
        6..=8 => "summer",
        _ => "autumn",
    }
}

/// Context block for `at`: the configured `context_info` verbatim, or a
/// synthesized one.
pub fn context_info_at(config: &AgentConfig, at: DateTime<Utc>) -> Value {
    if let Some(info) = config.context_info.as_ref().filter(|v| !v.is_null()) {
        return info.clone();
    }

    let local = localize(&config.timezone, at);
    json!({
        "category": build_category_string(config),
        "repetition": build_repetition_string(config),
        "nowtime": local.to_rfc3339_opts(SecondsFormat::Micros, false),
        "time_of_day": time_of_day(local.hour()),
        "day_of_week": day_name(local.weekday()),
        "weather": Value::Null,
        "season": season(local.month()),
    })
}

pub fn get_context_info(config: &AgentConfig) -> Value {
    context_info_at(config, Utc::now())
}

/// Assemble the request body for one turn at instant `at`.
pub fn build_payload_at(
    config: &AgentConfig,
    conversation_token: Option<&str>,
    user_text: &str,
    at: DateTime<Utc>,
) -> RequestPayload {
    let mut inputs = Map::new();
    inputs.insert("category".into(), build_category_string(config).into());
    inputs.insert("repetition".into(), build_repetition_string(config).into());
    inputs.insert("nowtime".into(), nowtime_at(&config.timezone, at).into());
    for (key, value) in &config.inputs {
        inputs.insert(key.clone(), value.clone());
    }

    let query = QuerySnapshot {
        user_input: user_text.to_string(),
        current_state: config.current_state.clone(),
        user_memory: config.user_memory.clone(),
        behavioral_patterns: config.behavioral_patterns.clone(),
        insight: config.insight.clone(),
        candidate_items: config.candidate_items.clone(),
        context_info: context_info_at(config, at),
    };

    let conversation_id = conversation_token
        .filter(|t| !t.is_empty())
        .map(String::from);

    debug!(
        agent = %config.name,
        new_conversation = conversation_id.is_none(),
        input_keys = inputs.len(),
        "built request payload"
    );

    RequestPayload {
        inputs,
        query,
        response_mode: ResponseMode::Blocking,
        user: config.user_id.clone(),
        conversation_id,
    }
}

/// Assemble the request body for one turn, stamped with the current time.
pub fn build_payload(
    config: &AgentConfig,
    conversation_token: Option<&str>,
    user_text: &str,
) -> RequestPayload {
    build_payload_at(config, conversation_token, user_text, Utc::now())
}
