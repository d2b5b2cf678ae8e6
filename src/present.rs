//! Output formatting.
//!
//! Stdout only ever carries the answer (or the history listing). Logs and
//! errors go to stderr.

use crate::history::HistoryEntry;
use crate::protocol::{AnnotationKind, ParsedAnswer, PromptRequest};
use crossterm::style::{style, Stylize};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// Glyph in front of the first line of an answer.
pub const MARKER: &str = "❯";

/// Delay between characters in progressive mode.
pub const TYPING_DELAY: Duration = Duration::from_millis(12);

/// How an answer is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Plain,
    Json,
    /// Plain output typed out one character at a time.
    Progressive,
}

/// Writes answers in one of the [`RenderMode`]s.
#[derive(Debug, Clone)]
pub struct Presenter {
    color: bool,
    delay: Duration,
}

impl Presenter {
    pub fn new(color: bool, delay: Duration) -> Self {
        Self { color, delay }
    }

    /// Presenter for stdout: colored when stdout is a terminal.
    pub fn for_stdout() -> Self {
        Self::new(atty::is(atty::Stream::Stdout), TYPING_DELAY)
    }

    /// Render `answer` to `out`.
    ///
    /// Progressive mode blocks the calling thread for the whole typing
    /// animation. Call it only once the request has finished and nothing
    /// else is waiting on the runtime.
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        request: &PromptRequest,
        answer: &ParsedAnswer,
        mode: RenderMode,
    ) -> io::Result<()> {
        match mode {
            RenderMode::Json => {
                let json = serde_json::to_string_pretty(&JsonAnswer::new(request, answer))?;
                writeln!(out, "{}", json)
            }
            RenderMode::Progressive if !self.delay.is_zero() => {
                for ch in self.format(answer).chars() {
                    write!(out, "{}", ch)?;
                    out.flush()?;
                    std::thread::sleep(self.delay);
                }
                Ok(())
            }
            RenderMode::Plain | RenderMode::Progressive => {
                write!(out, "{}", self.format(answer))?;
                out.flush()
            }
        }
    }

    /// The text written by plain and progressive mode.
    pub fn format(&self, answer: &ParsedAnswer) -> String {
        let mut text = String::new();

        let mut lines = answer.primary_text.lines();
        let first = lines.next().unwrap_or("");
        text.push_str(&self.paint(MARKER, Paint::Marker));
        text.push(' ');
        text.push_str(&self.paint(first, Paint::Primary));
        text.push('\n');
        for line in lines {
            text.push_str("  ");
            text.push_str(&self.paint(line, Paint::Primary));
            text.push('\n');
        }

        if let Some(warning) = answer.joined(AnnotationKind::Warning) {
            let line = format!("⚠ {}", warning);
            text.push_str(&self.paint(&line, Paint::Warning));
            text.push('\n');
        }
        if let Some(question) = answer.joined(AnnotationKind::Clarification) {
            let line = format!("? {}", question);
            text.push_str(&self.paint(&line, Paint::Clarification));
            text.push('\n');
        }

        text
    }

    fn paint(&self, text: &str, paint: Paint) -> String {
        if !self.color || text.is_empty() {
            return text.to_string();
        }
        match paint {
            Paint::Marker => style(text).green().bold().to_string(),
            Paint::Primary => style(text).bold().to_string(),
            Paint::Warning => style(text).yellow().to_string(),
            Paint::Clarification => style(text).cyan().to_string(),
        }
    }

    /// Render history entries, oldest first.
    pub fn render_history<W: Write>(
        &self,
        out: &mut W,
        entries: &[HistoryEntry],
        json: bool,
    ) -> io::Result<()> {
        if json {
            let json = serde_json::to_string_pretty(entries)?;
            return writeln!(out, "{}", json);
        }

        if entries.is_empty() {
            return writeln!(out, "No history yet.");
        }

        for entry in entries {
            let header = format!("[{}] {}: {}", entry.timestamp, entry.mode, entry.question);
            let header = if self.color {
                style(header).dark_grey().to_string()
            } else {
                header
            };
            writeln!(out, "{}", header)?;
            for line in entry.answer.lines() {
                writeln!(out, "  {}", line)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Paint {
    Marker,
    Primary,
    Warning,
    Clarification,
}

/// Shape of `--json` output.
#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
enum JsonAnswer<'a> {
    Generate {
        question: &'a str,
        command: &'a str,
        explanation: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        clarification: Option<String>,
    },
    Explain {
        command: &'a str,
        explanation: &'a str,
    },
}

impl<'a> JsonAnswer<'a> {
    fn new(request: &'a PromptRequest, answer: &'a ParsedAnswer) -> Self {
        match request {
            PromptRequest::Generate { question } => JsonAnswer::Generate {
                question,
                command: &answer.primary_text,
                explanation: answer.joined(AnnotationKind::Warning),
                clarification: answer.joined(AnnotationKind::Clarification),
            },
            PromptRequest::Explain { command_text } => JsonAnswer::Explain {
                command: command_text,
                explanation: &answer.primary_text,
            },
        }
    }
}
