//! Text rendering for the REPL transcript.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::config::AgentConfig;
use crate::types::AgentReply;

use super::commands::{CANCEL, END, PASTE, TOGGLE_MODE};

const RULE_WIDTH: usize = 60;
const PREVIEW_CHARS: usize = 50;

fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

fn compact(map: &Map<String, Value>) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

/// Startup banner listing the built-in commands.
pub fn banner(agent_names: &[&str]) -> String {
    let mut lines = vec![
        rule('='),
        "dify-probe".to_string(),
        rule('='),
        "Type 'exit' or 'quit' to leave".to_string(),
        "Type 'reset' to start a new conversation".to_string(),
        "Type 'config' to show the active agent's configuration".to_string(),
        format!("Multi-line input: finish with '{END}', discard with '{CANCEL}'"),
        format!("Type '{TOGGLE_MODE}' to switch between single-line and multi-line input"),
        format!("In single-line mode, '{PASTE}' opens a one-off multi-line block"),
    ];
    if agent_names.len() > 1 {
        let switches: Vec<String> = agent_names.iter().map(|n| format!(":{n}")).collect();
        lines.push(format!("Switch agents with {}", switches.join(" / ")));
    }
    lines.push(rule('='));
    lines.join("\n")
}

/// Config summary with the api key masked.
pub fn config_summary(config: &AgentConfig, conversation_token: Option<&str>) -> String {
    let context = match &config.context_info {
        Some(v) => v.to_string(),
        None => "(synthesized per request)".to_string(),
    };
    [
        rule('='),
        format!("Agent: {}", config.name),
        rule('-'),
        format!("API Key: {}", config.masked_api_key()),
        format!("Base URL: {}", config.base_url),
        format!("Timezone: {}", config.timezone),
        format!("User: {}", config.user_id),
        format!("Current state: {}", compact(&config.current_state)),
        format!("User memory: {}", compact(&config.user_memory)),
        format!("Behavioral patterns: {}", compact(&config.behavioral_patterns)),
        format!("Insight: {}", compact(&config.insight)),
        format!("Candidate items: {}", config.candidate_items.len()),
        format!("Context info: {context}"),
        format!("Conversation: {}", conversation_token.unwrap_or("(new)")),
        rule('='),
    ]
    .join("\n")
}

/// First 50 characters of the input, with `...` when cut.
pub fn input_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Framed reply block with conversation, timing, usage and model lines.
pub fn reply_block(reply: &AgentReply, elapsed: Duration) -> String {
    let mut lines = vec![
        rule('='),
        "Reply:".to_string(),
        rule('-'),
        reply.answer_text.clone(),
        rule('-'),
        format!("Conversation: {}", reply.conversation_token),
        format!("Response time: {:.2}s", elapsed.as_secs_f64()),
    ];
    if let Some(tokens) = reply.token_usage {
        lines.push(format!("Tokens: {tokens}"));
    }
    if let Some(model) = &reply.model_name {
        lines.push(format!("Model: {model}"));
    }
    lines.push(rule('='));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(input_preview("short"), "short");
        let long = "日".repeat(60);
        let preview = input_preview(&long);
        assert_eq!(preview.chars().count(), 53);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn reply_block_lists_optional_metadata() {
        let reply = AgentReply {
            answer_text: "hi".into(),
            conversation_token: "c1".into(),
            token_usage: Some(12),
            model_name: None,
            message_id: None,
        };
        let text = reply_block(&reply, Duration::from_millis(1500));
        assert!(text.contains("\nhi\n"));
        assert!(text.contains("Conversation: c1"));
        assert!(text.contains("Response time: 1.50s"));
        assert!(text.contains("Tokens: 12"));
        assert!(!text.contains("Model:"));
    }

    #[test]
    fn config_summary_masks_key() {
        let config = AgentConfig::new("a1", "app-abcdefghijklmnop", "http://x", "UTC", "u");
        let text = config_summary(&config, None);
        assert!(text.contains("API Key: app-abcdef..."));
        assert!(!text.contains("ghijklmnop"));
        assert!(text.contains("Conversation: (new)"));
    }

    #[test]
    fn banner_lists_switches_for_several_agents() {
        assert!(!banner(&["a"]).contains("Switch agents"));
        assert!(banner(&["a", "b"]).contains(":a / :b"));
    }
}
