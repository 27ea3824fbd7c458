//! Content extraction for uploaded transcripts.
//!
//! The file kind is chosen from the MIME hint and the file extension:
//!
//! - `text/*` hints and `.txt` / `.md` names are decoded as UTF-8 verbatim.
//! - `.pdf` names are parsed page by page, each page followed by a newline.
//! - `.docx` names are read paragraph by paragraph, joined with newlines.
//! - Anything else is tried as UTF-8, and otherwise reported as unsupported.
//!
//! Extraction never fails toward the caller: every error is rendered into the returned text.

mod docx;
mod pdf;

use thiserror::Error;

/// Extensions listed in the unsupported-format message.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".txt", ".md", ".pdf", ".docx"];

/// Prefix of the text returned when a supported file cannot be read.
pub const EXTRACTION_ERROR_PREFIX: &str = "Failed to read file: ";

/// Prefix of the text returned for binary files of an unknown type.
pub const UNSUPPORTED_FORMAT_PREFIX: &str = "Unsupported file format: ";

/// Failures raised inside the extractor before they are flattened into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Payload declared as text was not valid UTF-8.
    #[error("invalid UTF-8 content: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    /// The PDF parser rejected the payload.
    #[error("PDF parsing failed: {0}")]
    Pdf(String),
    /// The Word container or its XML body could not be read.
    #[error("DOCX parsing failed: {0}")]
    Docx(String),
}

/// An uploaded file as received from a caller.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Filename as supplied by the uploader.
    pub filename: String,
    /// Declared MIME type, if any.
    pub mime_type: Option<String>,
    /// Raw payload.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Build an upload from its parts.
    pub fn new(filename: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type,
            bytes,
        }
    }

    /// Extract plain text from this upload.
    pub fn extract_text(&self) -> String {
        extract_text(
            &self.bytes,
            self.mime_type.as_deref().unwrap_or_default(),
            &self.filename,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Text,
    Pdf,
    Docx,
    Unknown,
}

fn detect_kind(mime_hint: &str, lower_name: &str) -> FileKind {
    if mime_hint.starts_with("text/") || lower_name.ends_with(".txt") || lower_name.ends_with(".md")
    {
        FileKind::Text
    } else if lower_name.ends_with(".pdf") {
        FileKind::Pdf
    } else if lower_name.ends_with(".docx") {
        FileKind::Docx
    } else {
        FileKind::Unknown
    }
}

/// Convert an uploaded payload into plain text.
///
/// Errors are returned as a readable message starting with [`EXTRACTION_ERROR_PREFIX`];
/// undecodable files of unknown type yield a message starting with
/// [`UNSUPPORTED_FORMAT_PREFIX`].
pub fn extract_text(bytes: &[u8], mime_hint: &str, filename: &str) -> String {
    match try_extract(bytes, mime_hint, filename) {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(filename, error = %error, "Content extraction failed");
            format!("{EXTRACTION_ERROR_PREFIX}{error}")
        }
    }
}

fn try_extract(bytes: &[u8], mime_hint: &str, filename: &str) -> Result<String, ExtractionError> {
    let lower_name = filename.to_lowercase();
    let kind = detect_kind(mime_hint, &lower_name);
    tracing::debug!(filename, mime_hint, ?kind, size = bytes.len(), "Extracting content");

    match kind {
        FileKind::Text => Ok(String::from_utf8(bytes.to_vec())?),
        FileKind::Pdf => pdf::extract(bytes),
        FileKind::Docx => docx::extract(bytes),
        FileKind::Unknown => Ok(String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| unsupported_format_message(&lower_name))),
    }
}

fn unsupported_format_message(filename: &str) -> String {
    format!(
        "{UNSUPPORTED_FORMAT_PREFIX}{filename}\nSupported formats: {}",
        SUPPORTED_EXTENSIONS.join(", ")
    )
}
