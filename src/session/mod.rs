//! Interactive session: the read-eval-print loop over the loaded agents.
//!
//! The controller owns every piece of mutable session state (active agent,
//! per-agent conversation tokens, input mode). It reads from any
//! [`LineSource`] (an [`AsyncBufRead`] in tests, rustyline in the binary)
//! and writes the transcript to any [`Write`], so a session can be scripted
//! end to end.

pub mod commands;
pub mod input;
pub mod render;

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use strum::Display;
use tokio::io::AsyncBufRead;
use tracing::{debug, info, warn};

use crate::client::{AgentClient, DEFAULT_TIMEOUT};
use crate::config::{AgentConfig, ConfigStore};
use crate::error::{ProbeError, Result};
use crate::payload::build_payload;

pub use commands::Command;
pub use input::{EditorSource, LineEvent, LineSource, ReaderSource};

/// Outcome of reading one command's worth of input.
enum Next {
    Command(Command),
    Eof,
    Interrupted,
}

/// How keystrokes are collected into one user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionMode {
    SingleLine,
    MultiLine,
}

impl SessionMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::SingleLine => Self::MultiLine,
            Self::MultiLine => Self::SingleLine,
        }
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    ReadingCommand,
    AwaitingReply,
    Stopped,
}

/// Conversation continuation for one agent. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub agent_name: String,
    pub conversation_token: Option<String>,
}

impl ConversationState {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            conversation_token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.conversation_token.as_deref()
    }

    pub fn reset(&mut self) {
        self.conversation_token = None;
    }
}

/// Runtime knobs for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub timeout: Duration,
    pub initial_mode: SessionMode,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            initial_mode: SessionMode::MultiLine,
        }
    }
}

/// Drives the REPL for a set of agents.
pub struct SessionController {
    store: ConfigStore,
    client: Arc<dyn AgentClient>,
    settings: SessionSettings,
    states: Vec<ConversationState>,
    active: usize,
    mode: SessionMode,
    phase: SessionPhase,
    multiline_hint_shown: bool,
}

impl SessionController {
    pub fn new(store: ConfigStore, client: Arc<dyn AgentClient>, settings: SessionSettings) -> Self {
        let states = store
            .agents()
            .iter()
            .map(|a| ConversationState::new(a.name.clone()))
            .collect();
        Self {
            store,
            client,
            settings,
            states,
            active: 0,
            mode: settings.initial_mode,
            phase: SessionPhase::ReadingCommand,
            multiline_hint_shown: false,
        }
    }

    pub fn active_agent(&self) -> &AgentConfig {
        &self.store.agents()[self.active]
    }

    pub fn active_state(&self) -> &ConversationState {
        &self.states[self.active]
    }

    /// Token currently held for `agent_name`, if any.
    pub fn conversation_token(&self, agent_name: &str) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.agent_name == agent_name)
            .and_then(ConversationState::token)
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Clear the active agent's conversation token. Idempotent.
    pub fn reset(&mut self) {
        self.states[self.active].reset();
        info!(agent = %self.active_agent().name, "conversation reset");
    }

    /// Make `name` the active agent. Other agents keep their tokens.
    pub fn switch_to(&mut self, name: &str) -> Result<()> {
        let idx = self.store.position(name).ok_or_else(|| {
            ProbeError::Input(format!(
                "Unknown agent `{name}` (available: {})",
                self.store.names().join(", ")
            ))
        })?;
        self.active = idx;
        info!(agent = name, "switched active agent");
        Ok(())
    }

    pub fn toggle_mode(&mut self) -> SessionMode {
        self.mode = self.mode.toggled();
        if self.mode == SessionMode::MultiLine {
            self.multiline_hint_shown = false;
        }
        self.mode
    }

    /// Print the banner and the initial agent's config.
    pub fn greet<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", render::banner(&self.store.names()))?;
        writeln!(
            out,
            "{}\n",
            render::config_summary(self.active_agent(), self.active_state().token())
        )?;
        Ok(())
    }

    /// Run over a scripted reader until `exit`/`quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        self.run_with(&mut ReaderSource::new(input), out).await
    }

    /// Run until `exit`/`quit`, end of input or Ctrl-C.
    pub async fn run_with<S, W>(&mut self, source: &mut S, out: &mut W) -> Result<()>
    where
        S: LineSource + ?Sized,
        W: Write,
    {
        self.phase = SessionPhase::ReadingCommand;

        while self.phase != SessionPhase::Stopped {
            let next = match self.mode {
                SessionMode::SingleLine => self.read_single_line(source, out).await?,
                SessionMode::MultiLine => self.read_block(source, out, None, false).await?,
            };
            match next {
                Next::Command(command) => self.dispatch(command, out).await?,
                Next::Eof => {
                    writeln!(out, "\nBye!")?;
                    self.phase = SessionPhase::Stopped;
                }
                Next::Interrupted => {
                    writeln!(out, "\n\nInterrupted, bye!")?;
                    self.phase = SessionPhase::Stopped;
                }
            }
        }
        Ok(())
    }

    /// Execute one parsed command. Free text runs a full turn.
    pub async fn dispatch<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Empty => {}
            Command::Exit => {
                writeln!(out, "\nBye!")?;
                self.phase = SessionPhase::Stopped;
            }
            Command::Reset => {
                self.reset();
                writeln!(out, "✓ Conversation reset\n")?;
            }
            Command::ShowConfig => {
                writeln!(
                    out,
                    "{}\n",
                    render::config_summary(self.active_agent(), self.active_state().token())
                )?;
            }
            Command::ToggleMode => {
                let mode = self.toggle_mode();
                writeln!(out, "Switched to {mode} input.\n")?;
            }
            Command::SwitchAgent(name) => match self.switch_to(&name) {
                Ok(()) => {
                    let state = self.active_state();
                    writeln!(
                        out,
                        "✓ Switched to agent `{}` (conversation: {})\n",
                        state.agent_name,
                        state.token().unwrap_or("new")
                    )?;
                }
                Err(err) => self.report(&err, out)?,
            },
            Command::Paste(_) | Command::End | Command::Cancel => {
                let err = ProbeError::Input("Not inside a multi-line block".to_string());
                self.report(&err, out)?;
            }
            Command::Text(text) => self.turn(&text, out).await?,
        }
        Ok(())
    }

    /// One turn: build the payload, call the agent, render the outcome.
    /// Client failures are reported and leave the token untouched.
    pub async fn turn<W: Write>(&mut self, text: &str, out: &mut W) -> Result<()> {
        let idx = self.active;
        let agent = &self.store.agents()[idx];
        let token = self.states[idx].conversation_token.clone();

        writeln!(out, "\nCalling agent `{}`...", agent.name)?;
        writeln!(out, "Input: {}", render::input_preview(text))?;
        if let Some(token) = &token {
            writeln!(out, "Conversation: {token}")?;
        }
        out.flush()?;

        let payload = build_payload(agent, token.as_deref(), text);
        self.phase = SessionPhase::AwaitingReply;
        let started = Instant::now();
        let result = self
            .client
            .send(&agent.base_url, &agent.api_key, &payload, self.settings.timeout)
            .await;
        let elapsed = started.elapsed();
        self.phase = SessionPhase::ReadingCommand;

        match result {
            Ok(reply) => {
                debug!(
                    agent = %agent.name,
                    conversation_id = %reply.conversation_token,
                    tokens = reply.token_usage,
                    "turn completed"
                );
                writeln!(out, "\n{}\n", render::reply_block(&reply, elapsed))?;
                self.states[idx].conversation_token = Some(reply.conversation_token);
            }
            Err(err) => {
                warn!(agent = %agent.name, category = %err.category(), error = %err, "turn failed");
                self.report(&err, out)?;
            }
        }
        Ok(())
    }

    fn report<W: Write>(&self, err: &ProbeError, out: &mut W) -> Result<()> {
        writeln!(out, "\n❌ Error: {}\n", err.user_message())?;
        Ok(())
    }

    async fn prompt_line<S, W>(&self, source: &mut S, out: &mut W, prompt: &str) -> Result<LineEvent>
    where
        S: LineSource + ?Sized,
        W: Write,
    {
        out.flush()?;
        source.read_line(prompt).await
    }

    async fn read_single_line<S, W>(&mut self, source: &mut S, out: &mut W) -> Result<Next>
    where
        S: LineSource + ?Sized,
        W: Write,
    {
        let line = match self.prompt_line(source, out, "user_input> ").await? {
            LineEvent::Line(line) => line,
            LineEvent::Eof => return Ok(Next::Eof),
            LineEvent::Interrupted => return Ok(Next::Interrupted),
        };
        match Command::parse(&line) {
            Command::Paste(seed) => self.read_block(source, out, Some(seed), true).await,
            command => Ok(Next::Command(command)),
        }
    }

    /// Accumulate lines until `:end`. A partial block is dropped when input
    /// ends or is interrupted.
    async fn read_block<S, W>(
        &mut self,
        source: &mut S,
        out: &mut W,
        seed: Option<String>,
        force_hint: bool,
    ) -> Result<Next>
    where
        S: LineSource + ?Sized,
        W: Write,
    {
        if force_hint || !self.multiline_hint_shown {
            writeln!(
                out,
                "Multi-line input: '{}' to send, '{}' to discard, '{}' for single-line mode.",
                commands::END,
                commands::CANCEL,
                commands::TOGGLE_MODE
            )?;
            self.multiline_hint_shown = true;
        }

        let mut buffer: Vec<String> = seed.into_iter().filter(|s| !s.trim().is_empty()).collect();

        loop {
            let prompt = if buffer.is_empty() {
                "user_input (multi-line)> "
            } else {
                "... "
            };
            let line = match self.prompt_line(source, out, prompt).await? {
                LineEvent::Line(line) => line,
                LineEvent::Eof => return Ok(Next::Eof),
                LineEvent::Interrupted => return Ok(Next::Interrupted),
            };

            match Command::parse(&line) {
                command if buffer.is_empty() && command.opens_block() => {
                    return Ok(Next::Command(command))
                }
                // Already collecting; keep whatever followed `:paste`.
                Command::Paste(seed) if buffer.is_empty() => {
                    if !seed.trim().is_empty() {
                        buffer.push(seed);
                    }
                }
                Command::Empty if buffer.is_empty() => continue,
                Command::Cancel => {
                    writeln!(out, "⚠️ Input discarded.\n")?;
                    return Ok(Next::Command(Command::Empty));
                }
                Command::End => break,
                _ => buffer.push(line),
            }
        }

        let combined = buffer.join("\n").trim().to_string();
        if combined.is_empty() {
            writeln!(out, "⚠️ Nothing entered, block closed.\n")?;
            return Ok(Next::Command(Command::Empty));
        }
        Ok(Next::Command(Command::Text(combined)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentReply, RequestPayload};
    use async_trait::async_trait;

    struct EchoClient;

    #[async_trait]
    impl AgentClient for EchoClient {
        async fn send(
            &self,
            _base_url: &str,
            _api_key: &str,
            payload: &RequestPayload,
            _timeout: Duration,
        ) -> Result<AgentReply> {
            Ok(AgentReply {
                answer_text: payload.query.user_input.clone(),
                conversation_token: "c1".into(),
                token_usage: None,
                model_name: None,
                message_id: None,
            })
        }
    }

    fn controller(mode: SessionMode) -> SessionController {
        let store = ConfigStore::from_agents(vec![
            AgentConfig::new("agent1", "k", "http://x", "UTC", "u"),
            AgentConfig::new("agent2", "k", "http://y", "UTC", "u"),
        ])
        .unwrap();
        SessionController::new(
            store,
            Arc::new(EchoClient),
            SessionSettings {
                initial_mode: mode,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn toggle_mode_flips_and_rearms_hint() {
        let mut session = controller(SessionMode::SingleLine);
        let mut out = Vec::new();
        session.dispatch(Command::ToggleMode, &mut out).await.unwrap();
        assert_eq!(session.mode(), SessionMode::MultiLine);
        assert!(String::from_utf8(out).unwrap().contains("multi-line"));
        assert_eq!(session.toggle_mode(), SessionMode::SingleLine);
    }

    #[tokio::test]
    async fn multiline_block_joins_lines() {
        let mut session = controller(SessionMode::MultiLine);
        let mut out = Vec::new();
        session
            .run(&b"first\nsecond\n:end\nexit\n"[..], &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\nfirst\nsecond\n"), "{text}");
        assert_eq!(session.phase(), SessionPhase::Stopped);
    }

    #[tokio::test]
    async fn cancel_discards_block_without_calling() {
        let mut session = controller(SessionMode::MultiLine);
        let mut out = Vec::new();
        session
            .run(&b"draft\n:cancel\nquit\n"[..], &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Input discarded"));
        assert!(!text.contains("Calling agent"));
        assert_eq!(session.conversation_token("agent1"), None);
    }

    #[tokio::test]
    async fn end_outside_block_is_input_error() {
        let mut session = controller(SessionMode::SingleLine);
        let mut out = Vec::new();
        session.run(&b":end\nexit\n"[..], &mut out).await.unwrap();
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Not inside a multi-line block"));
    }

    #[tokio::test]
    async fn paste_opens_one_off_block_in_single_line_mode() {
        let mut session = controller(SessionMode::SingleLine);
        let mut out = Vec::new();
        session
            .run(&b":paste line one\nline two\n:end\nexit\n"[..], &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\nline one\nline two\n"), "{text}");
        assert_eq!(session.mode(), SessionMode::SingleLine);
        assert_eq!(session.conversation_token("agent1"), Some("c1"));
    }

    #[tokio::test]
    async fn eof_stops_and_drops_partial_block() {
        let mut session = controller(SessionMode::MultiLine);
        let mut out = Vec::new();
        session.run(&b"unfinished\n"[..], &mut out).await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert!(!String::from_utf8(out).unwrap().contains("Calling agent"));
    }

    #[tokio::test]
    async fn paste_seed_on_first_block_line_is_kept() {
        let mut session = controller(SessionMode::MultiLine);
        let mut out = Vec::new();
        session
            .run(
                &b":paste important first line\nsecond\n:end\nexit\n"[..],
                &mut out,
            )
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\nimportant first line\nsecond\n"), "{text}");
    }

    struct Scripted(std::collections::VecDeque<LineEvent>);

    #[async_trait(?Send)]
    impl LineSource for Scripted {
        async fn read_line(&mut self, _prompt: &str) -> Result<LineEvent> {
            Ok(self.0.pop_front().unwrap_or(LineEvent::Eof))
        }
    }

    #[tokio::test]
    async fn interrupt_stops_session_and_drops_block() {
        let mut session = controller(SessionMode::MultiLine);
        let mut source = Scripted(
            [
                LineEvent::Line("half typed".into()),
                LineEvent::Interrupted,
                LineEvent::Line("never read".into()),
                LineEvent::Line(":end".into()),
            ]
            .into(),
        );
        let mut out = Vec::new();
        session.run_with(&mut source, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert!(text.contains("Interrupted, bye!"), "{text}");
        assert!(!text.contains("Calling agent"), "{text}");
        assert_eq!(source.0.len(), 2);
    }

    #[test]
    fn switch_to_unknown_agent_is_input_error() {
        let mut session = controller(SessionMode::SingleLine);
        let err = session.switch_to("nope").unwrap_err();
        assert!(matches!(err, ProbeError::Input(ref m) if m.contains("agent1, agent2")));
        assert_eq!(session.active_agent().name, "agent1");
    }
}
