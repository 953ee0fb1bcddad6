//! Line sources feeding the REPL.
//!
//! Scripted input (tests, pipes) comes through [`ReaderSource`]; the
//! interactive binary uses [`EditorSource`], a rustyline editor with
//! in-memory history and proper wide-character line editing.

use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::{ProbeError, Result};

/// One read from a line source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Line(String),
    /// End of input (Ctrl-D or a closed pipe).
    Eof,
    /// Ctrl-C at the prompt.
    Interrupted,
}

/// Produces raw input lines. `prompt` is shown by interactive sources.
#[async_trait(?Send)]
pub trait LineSource {
    async fn read_line(&mut self, prompt: &str) -> Result<LineEvent>;
}

/// Lines from any async reader. Prompts are not echoed.
pub struct ReaderSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait(?Send)]
impl<R: AsyncBufRead + Unpin> LineSource for ReaderSource<R> {
    async fn read_line(&mut self, _prompt: &str) -> Result<LineEvent> {
        Ok(match self.lines.next_line().await? {
            Some(line) => LineEvent::Line(line),
            None => LineEvent::Eof,
        })
    }
}

/// Interactive terminal input through rustyline.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_failure)?;
        Ok(Self { editor })
    }
}

#[async_trait(?Send)]
impl LineSource for EditorSource {
    async fn read_line(&mut self, prompt: &str) -> Result<LineEvent> {
        let event = map_readline(self.editor.readline(prompt))?;
        if let LineEvent::Line(line) = &event {
            if !line.trim().is_empty() {
                let _ = self.editor.add_history_entry(line.as_str());
            }
        }
        Ok(event)
    }
}

fn readline_failure(err: ReadlineError) -> ProbeError {
    ProbeError::Io(std::io::Error::other(format!("line editor: {err}")))
}

/// Translate a rustyline result into a [`LineEvent`].
pub fn map_readline(result: std::result::Result<String, ReadlineError>) -> Result<LineEvent> {
    match result {
        Ok(line) => Ok(LineEvent::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(LineEvent::Interrupted),
        Err(ReadlineError::Eof) => Ok(LineEvent::Eof),
        Err(err) => Err(readline_failure(err)),
    }
}
