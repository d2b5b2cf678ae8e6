//! Request and answer types shared across the pipeline.
//!
//! A [`PromptRequest`] goes in, the model replies with a [`RawCompletion`],
//! and normalization turns that into a [`ParsedAnswer`].

use serde::{Deserialize, Serialize};

/// Which of the two templates a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Generate,
    Explain,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Generate => write!(f, "generate"),
            Mode::Explain => write!(f, "explain"),
        }
    }
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptRequest {
    /// Turn a natural-language question into a command.
    Generate { question: String },
    /// Explain an existing command.
    Explain { command_text: String },
}

impl PromptRequest {
    pub fn mode(&self) -> Mode {
        match self {
            PromptRequest::Generate { .. } => Mode::Generate,
            PromptRequest::Explain { .. } => Mode::Explain,
        }
    }

    /// The user's input, whichever variant this is.
    pub fn text(&self) -> &str {
        match self {
            PromptRequest::Generate { question } => question,
            PromptRequest::Explain { command_text } => command_text,
        }
    }
}

/// Unprocessed model output, kept only until it is normalized.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub request: PromptRequest,
    pub text: String,
}

/// Kind of side-channel line the model was asked to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Follows a potentially destructive command.
    Warning,
    /// Asks the user to disambiguate the request.
    Clarification,
}

/// A side-channel line pulled out of the model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub text: String,
}

impl Annotation {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Warning,
            text: text.into(),
        }
    }

    pub fn clarification(text: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Clarification,
            text: text.into(),
        }
    }
}

/// Model output split into the command (or explanation) and its annotations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedAnswer {
    /// The command in generate mode, the explanation body in explain mode.
    pub primary_text: String,
    /// Annotation lines, in the order they appeared.
    pub annotations: Vec<Annotation>,
}

impl ParsedAnswer {
    /// All annotations of one kind joined with a single space, if any exist.
    pub fn joined(&self, kind: AnnotationKind) -> Option<String> {
        let parts: Vec<&str> = self
            .annotations
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.text.as_str())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}
