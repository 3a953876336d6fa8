//! Conversation controller: sequences resume upload, retrieval and
//! generation for one session at a time.
//!
//! The controller holds no per-session data. Callers pass the session they
//! own (`&mut SessionState`), so one session's actions are naturally
//! sequential and separate sessions never share mutable state.

use std::io::Write;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chat::prompts::{
    TURN_ERROR_PREFIX, UPLOAD_CONFIRMATION, UPLOAD_ERROR_PREFIX, UPLOAD_FIRST_REPLY,
};
use crate::chat::session::{ConversationTurn, SessionState};
use crate::generation::{GenerationError, ResponseGenerator};
use crate::resume::{ExtractionError, ResumeExtractor};
use crate::retrieval::{RetrievalError, RetrievalService};

/// Result of a successful `handle_upload` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The resume was extracted and stored; carries the extracted text.
    Processed(String),
    /// The session already had a resume. Nothing was read or changed.
    AlreadyProcessed,
}

/// Failure of a chat turn. Never fatal to the session.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("there is no unanswered message to retry")]
    NothingToRetry,

    #[error("job retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("reply generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl TurnError {
    /// Transient notice for the user. Not recorded in history.
    pub fn notice(&self) -> String {
        format!("{TURN_ERROR_PREFIX}: {self}")
    }
}

/// Transient notice for a failed upload. Not recorded in history.
pub fn upload_notice(err: &ExtractionError) -> String {
    format!("{UPLOAD_ERROR_PREFIX}: {err}. Please try again.")
}

pub struct ConversationController {
    extractor: Arc<dyn ResumeExtractor>,
    retrieval: Arc<dyn RetrievalService>,
    generator: Arc<dyn ResponseGenerator>,
}

impl ConversationController {
    pub fn new(
        extractor: Arc<dyn ResumeExtractor>,
        retrieval: Arc<dyn RetrievalService>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Self {
        Self {
            extractor,
            retrieval,
            generator,
        }
    }

    /// Extracts and stores the session's resume, then records the assistant's
    /// confirmation turn.
    ///
    /// A session that already has a resume is left untouched. On failure the
    /// session stays in the "no resume" state and the caller may retry.
    pub async fn handle_upload(
        &self,
        session: &mut SessionState,
        file_bytes: &[u8],
    ) -> Result<UploadOutcome, ExtractionError> {
        session.touch();

        if session.resume_available() {
            debug!("Resume already processed for this session; ignoring upload");
            return Ok(UploadOutcome::AlreadyProcessed);
        }

        let text = self.extract(file_bytes).await.map_err(|e| {
            warn!("Resume extraction failed: {e}");
            e
        })?;

        session.record_resume(text.clone());
        session.push(ConversationTurn::assistant(UPLOAD_CONFIRMATION));
        info!("Resume processed ({} chars)", text.len());
        Ok(UploadOutcome::Processed(text))
    }

    /// Records the user's message and answers it.
    ///
    /// The user turn is kept even when the reply fails, so the failed turn can
    /// be answered later with `retry_last_turn`.
    pub async fn handle_user_message(
        &self,
        session: &mut SessionState,
        text: &str,
    ) -> Result<ConversationTurn, TurnError> {
        if text.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        session.touch();
        session.push(ConversationTurn::user(text));
        self.answer(session, text).await
    }

    /// Answers the newest user turn if its reply previously failed.
    pub async fn retry_last_turn(
        &self,
        session: &mut SessionState,
    ) -> Result<ConversationTurn, TurnError> {
        let message = session
            .unanswered_user_turn()
            .map(|t| t.content.clone())
            .ok_or(TurnError::NothingToRetry)?;

        session.touch();
        self.answer(session, &message).await
    }

    async fn answer(
        &self,
        session: &mut SessionState,
        message: &str,
    ) -> Result<ConversationTurn, TurnError> {
        let reply = match session.resume_text() {
            None => UPLOAD_FIRST_REPLY.to_string(),
            Some(resume_text) => self.personalised_reply(message, resume_text).await?,
        };

        let turn = ConversationTurn::assistant(reply);
        session.push(turn.clone());
        Ok(turn)
    }

    async fn personalised_reply(&self, message: &str, resume_text: &str) -> Result<String, TurnError> {
        let job_context = self
            .retrieval
            .get_relevant_jobs(resume_text)
            .await
            .map_err(|e| {
                warn!("Job retrieval failed: {e}");
                e
            })?;
        debug!("Retrieved {} postings", job_context.jobs.len());

        let reply = self
            .generator
            .generate(message, resume_text, &job_context)
            .await
            .map_err(|e| {
                warn!("Reply generation failed: {e}");
                e
            })?;

        if reply.trim().is_empty() {
            warn!("Reply generation returned blank output");
            return Err(GenerationError::EmptyOutput.into());
        }
        Ok(reply)
    }

    /// Writes the upload to a temp file that lives only for this call, then
    /// runs the extractor on it. The file is removed on every exit path.
    async fn extract(&self, file_bytes: &[u8]) -> Result<String, ExtractionError> {
        if file_bytes.is_empty() {
            return Err(ExtractionError::EmptyFile);
        }

        let mut tmp = tempfile::Builder::new()
            .prefix("resume-")
            .suffix(".pdf")
            .tempfile()
            .map_err(ExtractionError::TempFile)?;
        tmp.write_all(file_bytes)
            .and_then(|_| tmp.flush())
            .map_err(ExtractionError::TempFile)?;

        let result = self.extractor.process(tmp.path()).await;

        if let Err(e) = tmp.close() {
            warn!("Failed to remove temporary resume file: {e}");
        }

        let text = result?;
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}
