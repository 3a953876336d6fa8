//! In-memory job posting index with cosine-similarity search.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::retrieval::embedding::Embedder;
use crate::retrieval::RetrievalError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub description: String,
}

impl JobPosting {
    /// Text that gets embedded for this posting.
    pub fn embedding_text(&self) -> String {
        let mut text = format!("{} at {}", self.title, self.company);
        if let Some(location) = &self.location {
            text.push_str(&format!(" ({location})"));
        }
        text.push('\n');
        text.push_str(&self.description);
        text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredJob {
    pub posting: JobPosting,
    pub similarity: f32,
}

/// Reads the posting corpus (a JSON array) from disk.
pub fn load_postings(path: &Path) -> Result<Vec<JobPosting>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job postings from {}", path.display()))?;
    let postings: Vec<JobPosting> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid job postings JSON in {}", path.display()))?;
    if postings.is_empty() {
        bail!("Job postings file {} contains no postings", path.display());
    }
    Ok(postings)
}

pub struct JobIndex {
    entries: Vec<(JobPosting, Vec<f32>)>,
}

impl JobIndex {
    /// Embeds every posting up front. Called once at start-up.
    pub async fn build(
        postings: Vec<JobPosting>,
        embedder: &dyn Embedder,
    ) -> Result<Self, RetrievalError> {
        let texts: Vec<String> = postings.iter().map(JobPosting::embedding_text).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != postings.len() {
            return Err(RetrievalError::MalformedResponse(format!(
                "embedded {} of {} postings",
                vectors.len(),
                postings.len()
            )));
        }
        info!("Job index built with {} postings", postings.len());
        Ok(Self {
            entries: postings.into_iter().zip(vectors).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top `k` postings by cosine similarity, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredJob> {
        let mut scored: Vec<ScoredJob> = self
            .entries
            .iter()
            .map(|(posting, vector)| ScoredJob {
                posting: posting.clone(),
                similarity: cosine_similarity(query, vector),
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);
        scored
    }
}

/// Zero for mismatched dimensions or zero-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
