//! Plain text extraction from `.txt`, `.md` and `.docx` files.

pub mod docx;

use crate::error::DocumentError;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Markdown,
    Docx,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn detect(path: &Path) -> Result<Self, DocumentError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| DocumentError::UnsupportedFormat(path.display().to_string()))
    }
}

/// Document-text extraction collaborator: path to plain text.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, DocumentError>;
}

/// Dispatches on file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor;

impl DocumentExtractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<String, DocumentError> {
        let format = DocumentFormat::detect(path)?;
        let text = match format {
            DocumentFormat::Text | DocumentFormat::Markdown => {
                let bytes = std::fs::read(path)?;
                String::from_utf8(bytes).map_err(|err| DocumentError::CorruptFile {
                    path: path.display().to_string(),
                    reason: format!("not valid UTF-8: {err}"),
                })?
            }
            DocumentFormat::Docx => docx::extract_docx(path)?,
        };
        tracing::debug!(
            path = %path.display(),
            format = %format,
            chars = text.chars().count(),
            "Extracted document text"
        );
        Ok(text)
    }
}
