//! REPL command parsing.
//!
//! Built-in words (`exit`, `quit`, `reset`, `config`) and `:`-prefixed
//! tokens are commands; everything else is text for the agent. Matching is
//! case-insensitive except for agent names.

pub const PASTE: &str = ":paste";
pub const END: &str = ":end";
pub const CANCEL: &str = ":cancel";
pub const TOGGLE_MODE: &str = ":chmod";

/// Parsed REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `exit` / `quit`
    Exit,
    /// Drop the active agent's conversation token.
    Reset,
    /// Print the active agent's config.
    ShowConfig,
    /// `:chmod`, flip between single-line and multi-line input.
    ToggleMode,
    /// `:paste [text]`, open a one-off block seeded with `text`.
    Paste(String),
    /// `:end`, close a block.
    End,
    /// `:cancel`, discard a block.
    Cancel,
    /// `:<agent_name>`
    SwitchAgent(String),
    /// Free text for the agent.
    Text(String),
    /// Blank line.
    Empty,
}

fn strip_paste(line: &str) -> Option<&str> {
    let head = line.get(..PASTE.len())?;
    if !head.eq_ignore_ascii_case(PASTE) {
        return None;
    }
    let rest = &line[PASTE.len()..];
    if rest.is_empty() {
        return Some(rest);
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    // Only the single separator is dropped; the rest is pasted content.
    let mut chars = rest.chars();
    chars.next();
    Some(chars.as_str())
}

impl Command {
    /// Parse one raw input line.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }

        let left = line.trim_start();
        if let Some(seed) = strip_paste(left) {
            return Command::Paste(seed.trim_end_matches(['\r', '\n']).to_string());
        }

        match trimmed.to_lowercase().as_str() {
            "exit" | "quit" => return Command::Exit,
            "reset" => return Command::Reset,
            "config" => return Command::ShowConfig,
            TOGGLE_MODE => return Command::ToggleMode,
            END => return Command::End,
            CANCEL => return Command::Cancel,
            _ => {}
        }

        if let Some(name) = trimmed.strip_prefix(':') {
            if !name.is_empty() && !name.contains(char::is_whitespace) {
                return Command::SwitchAgent(name.to_string());
            }
        }

        Command::Text(trimmed.to_string())
    }

    /// Whether this command may interrupt a fresh multi-line block when it
    /// appears as the block's first line.
    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            Command::Exit
                | Command::Reset
                | Command::ShowConfig
                | Command::ToggleMode
                | Command::SwitchAgent(_)
        )
    }
}
