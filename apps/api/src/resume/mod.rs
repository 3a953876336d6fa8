//! Resume text extraction.
//!
//! The chat controller only sees the `ResumeExtractor` trait; the default
//! backend reads PDFs with `pdf-extract` on a blocking thread.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("the uploaded file is empty")]
    EmptyFile,

    #[error("unsupported file format, expected a PDF")]
    UnsupportedFormat,

    #[error("no text could be extracted from the document")]
    NoText,

    #[error("could not read the uploaded file: {0}")]
    Io(#[from] std::io::Error),

    /// The upload could not be staged on local disk. Not the user's fault.
    #[error("could not stage the upload: {0}")]
    TempFile(std::io::Error),

    #[error("could not parse PDF: {0}")]
    Parse(String),
}

/// Turns a resume document on disk into plain text.
#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn process(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// PDF backend built on `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfResumeExtractor;

#[async_trait]
impl ResumeExtractor for PdfResumeExtractor {
    async fn process(&self, path: &Path) -> Result<String, ExtractionError> {
        let header = read_header(path).await?;
        if header.is_empty() {
            return Err(ExtractionError::EmptyFile);
        }
        if !header.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::UnsupportedFormat);
        }

        let owned: PathBuf = path.to_path_buf();
        let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| ExtractionError::Parse(format!("extraction task failed: {e}")))?
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let text = normalize_text(&raw);
        if text.is_empty() {
            return Err(ExtractionError::NoText);
        }

        debug!("Extracted {} chars of resume text", text.len());
        Ok(text)
    }
}

async fn read_header(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; PDF_MAGIC.len()];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Collapses runs of spaces inside lines and drops blank lines.
/// PDF text layers are full of layout padding that only costs prompt tokens.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
