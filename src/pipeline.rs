//! Request pipeline: probe, prompt, complete, normalize, record.
//!
//! Presentation is left to the caller so the same [`Outcome`] can be printed
//! as plain text or JSON.

use crate::context::EnvironmentSnapshot;
use crate::error::{classify_message, Classifier, Error};
use crate::history::{HistoryEntry, HistoryStore};
use crate::llm::CompletionClient;
use crate::normalize::{normalize, split};
use crate::prompt;
use crate::protocol::{ParsedAnswer, PromptRequest, RawCompletion};
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of a successful request.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub request: PromptRequest,
    /// Model output after normalization, as stored in history.
    pub normalized: String,
    pub answer: ParsedAnswer,
}

/// Runs one request against a completion client.
pub struct Pipeline<'a> {
    client: &'a dyn CompletionClient,
    history: &'a HistoryStore,
    classifier: Classifier,
}

impl<'a> Pipeline<'a> {
    pub fn new(client: &'a dyn CompletionClient, history: &'a HistoryStore) -> Self {
        Self {
            client,
            history,
            classifier: classify_message,
        }
    }

    /// Replace the transport error classifier.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Capture the environment for `request` and run it.
    ///
    /// Explain mode only needs the minimal snapshot.
    pub async fn run(
        &self,
        request: PromptRequest,
        cwd: &Path,
        credential: &str,
    ) -> Result<Outcome, Error> {
        let env = match request {
            PromptRequest::Generate { .. } => EnvironmentSnapshot::capture(cwd),
            PromptRequest::Explain { .. } => EnvironmentSnapshot::minimal(cwd),
        };
        debug!(
            "Captured environment: {} file(s), {} tool(s), repository: {}",
            env.files.names.len(),
            env.tools.len(),
            env.vcs.is_repository
        );

        self.run_with_snapshot(request, &env, credential).await
    }

    /// Run `request` against an already captured snapshot.
    pub async fn run_with_snapshot(
        &self,
        request: PromptRequest,
        env: &EnvironmentSnapshot,
        credential: &str,
    ) -> Result<Outcome, Error> {
        let prompt = prompt::build(&request, env);
        info!(
            "Sending {} request to {} ({})",
            request.mode(),
            self.client.name(),
            self.client.model()
        );
        debug!("Prompt:\n{}", prompt);

        let text = self
            .client
            .complete(&prompt, credential)
            .await
            .map_err(|e| {
                let message = format!("{:#}", e);
                let kind = (self.classifier)(&message);
                debug!("Completion failed ({:?}): {}", kind, message);
                Error::from_transport(kind, message)
            })?;

        let raw = RawCompletion { request, text };
        debug!("Raw completion: {:?}", raw.text);

        let normalized = normalize(&raw.text);
        if normalized.is_empty() {
            return Err(Error::EmptyContent);
        }
        let answer = split(&normalized);

        let entry = HistoryEntry::now(raw.request.mode(), raw.request.text(), normalized.as_str());
        if let Err(e) = self.history.append(entry) {
            warn!("Failed to record history: {:#}", e);
        }

        Ok(Outcome {
            request: raw.request,
            normalized,
            answer,
        })
    }
}
