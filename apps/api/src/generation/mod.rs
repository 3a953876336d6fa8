//! Chat reply generation via the LLM client.

pub mod prompts;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::generation::prompts::{COACH_PROMPT_TEMPLATE, COACH_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::retrieval::JobContext;

/// Upper bound on resume characters sent to the model.
const MAX_RESUME_CHARS: usize = 12_000;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("language model returned an empty reply")]
    EmptyOutput,
}

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        user_message: &str,
        resume_text: &str,
        job_context: &JobContext,
    ) -> Result<String, GenerationError>;
}

pub struct LlmResponseGenerator {
    llm: LlmClient,
}

impl LlmResponseGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ResponseGenerator for LlmResponseGenerator {
    async fn generate(
        &self,
        user_message: &str,
        resume_text: &str,
        job_context: &JobContext,
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(user_message, resume_text, job_context);
        debug!("Generating reply (prompt {} chars)", prompt.len());

        let reply = self.llm.complete(&prompt, COACH_SYSTEM).await.map_err(|e| match e {
            LlmError::EmptyContent => GenerationError::EmptyOutput,
            other => GenerationError::Llm(other),
        })?;
        Ok(reply)
    }
}

pub fn build_prompt(user_message: &str, resume_text: &str, job_context: &JobContext) -> String {
    COACH_PROMPT_TEMPLATE
        .replace("{resume_text}", truncate_chars(resume_text, MAX_RESUME_CHARS))
        .replace("{job_context}", &job_context.render())
        .replace("{user_message}", user_message.trim())
}

/// Longest prefix of at most `max` chars, cut on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
