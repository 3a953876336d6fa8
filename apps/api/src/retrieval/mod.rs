//! Job retrieval: embeds the resume and finds the closest postings.

pub mod embedding;
pub mod index;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::retrieval::embedding::Embedder;
use crate::retrieval::index::{JobIndex, ScoredJob};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed retrieval response: {0}")]
    MalformedResponse(String),

    #[error("no job postings available")]
    EmptyIndex,
}

/// Postings judged relevant to a resume, best match first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobContext {
    pub jobs: Vec<ScoredJob>,
}

impl JobContext {
    /// Plain-text rendering for inclusion in an LLM prompt.
    pub fn render(&self) -> String {
        if self.jobs.is_empty() {
            return "No matching job postings were found.".to_string();
        }
        self.jobs
            .iter()
            .enumerate()
            .map(|(i, job)| {
                let p = &job.posting;
                let mut block = format!("{}. {} at {}", i + 1, p.title, p.company);
                if let Some(location) = &p.location {
                    block.push_str(&format!(" ({location})"));
                }
                block.push_str(&format!(" [match {:.2}]", job.similarity));
                if let Some(url) = &p.url {
                    block.push_str(&format!("\n   {url}"));
                }
                block.push_str(&format!("\n   {}", p.description));
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
pub trait RetrievalService: Send + Sync {
    async fn get_relevant_jobs(&self, resume_text: &str) -> Result<JobContext, RetrievalError>;
}

/// Embeds the resume with the same model that indexed the postings and
/// returns the `top_k` nearest ones.
pub struct EmbeddingRetriever<E> {
    embedder: E,
    index: JobIndex,
    top_k: usize,
}

impl<E: Embedder> EmbeddingRetriever<E> {
    pub fn new(embedder: E, index: JobIndex, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }
}

#[async_trait]
impl<E: Embedder> RetrievalService for EmbeddingRetriever<E> {
    async fn get_relevant_jobs(&self, resume_text: &str) -> Result<JobContext, RetrievalError> {
        if self.index.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }
        let query = self
            .embedder
            .embed(&[resume_text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::MalformedResponse("no embedding returned".to_string()))?;

        let jobs = self.index.search(&query, self.top_k);
        debug!(
            "Retrieved {} postings (best similarity {:?})",
            jobs.len(),
            jobs.first().map(|j| j.similarity)
        );
        Ok(JobContext { jobs })
    }
}
