//! Language model completion.
//!
//! The pipeline only needs "prompt in, text out", so every backend sits
//! behind the [`CompletionClient`] trait. Errors are returned as-is and
//! classified by the pipeline.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

pub use openai::OpenAIClient;

/// Sends a prompt to a model and returns the raw reply.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete `prompt`, authenticating with `credential`.
    async fn complete(&self, prompt: &str, credential: &str) -> Result<String>;

    /// Backend name, for logging.
    fn name(&self) -> &'static str;

    /// Model name, for logging.
    fn model(&self) -> &str;
}
