//! Record shapes and errors for the project store.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::well_known::{Iso8601, Rfc3339},
};

/// Errors returned by the document store.
///
/// Malformed record files never surface here: they are skipped while listing.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed (permissions, disk full, ...).
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Record could not be serialized.
    #[error("Failed to encode document record: {0}")]
    Encode(#[from] serde_json::Error),
    /// A document identifier tried to escape its project directory.
    #[error("Invalid document identifier: {0}")]
    InvalidIdentifier(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io { path, source }
    }
}

/// One ingested and summarized file, persisted as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Filename as supplied by the uploader.
    pub original_filename: String,
    /// Outline text applied during summarization.
    pub template_used: String,
    /// Record creation instant. Written as RFC 3339; offset-less ISO 8601 is accepted on read.
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "deserialize_timestamp"
    )]
    pub processed_at: OffsetDateTime,
    /// Summary text produced by the language model (or the demo/error text).
    pub content: String,
    /// Per-project write-sequence number, starting at 1.
    pub sync_number: u32,
    /// Calendar date of creation, `YYYY-MM-DD`.
    pub date: String,
    /// `{date}_sync_{sync_number}`; also the stable identifier of the record.
    pub generated_filename: String,
}

/// Result of a successful [`crate::store::DocumentStore::save`].
#[derive(Debug, Clone)]
pub struct SavedDocument {
    /// Location of the new record file.
    pub path: PathBuf,
    /// Generated name, without the `.txt` extension.
    pub generated_name: String,
    /// The record as written.
    pub record: DocumentRecord,
}

/// Per-project statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    /// Project name (directory name).
    pub name: String,
    /// Number of readable records.
    pub document_count: usize,
    /// Most recent `processed_at` across the records.
    #[serde(with = "time::serde::rfc3339::option")]
    pub latest_update: Option<OffsetDateTime>,
}

/// Workspace-wide statistics across every project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceOverview {
    /// One entry per project, sorted by name.
    pub projects: Vec<ProjectSummary>,
    /// Sum of `document_count` over all projects.
    pub total_documents: usize,
    /// Average documents per project, `0.0` when there are no projects.
    pub average_documents: f64,
}

/// Current instant in the local offset, or UTC when the offset cannot be determined.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Format the calendar date of `instant` as `YYYY-MM-DD`.
pub fn calendar_date(instant: OffsetDateTime) -> String {
    let date = instant.date();
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parse a record timestamp.
///
/// RFC 3339 is tried first. A timestamp without an offset, such as
/// `2024-05-02T08:00:00.123456`, is read as local wall-clock time.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(instant);
    }
    let naive = PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)?;
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    Ok(naive.assume_offset(offset))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Build the generated record name for a date and sequence number.
pub fn generated_name(date: &str, sync_number: u32) -> String {
    format!("{date}_sync_{sync_number}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn calendar_date_is_zero_padded() {
        assert_eq!(calendar_date(datetime!(2024-03-07 09:15 UTC)), "2024-03-07");
    }

    #[test]
    fn generated_name_combines_date_and_sequence() {
        assert_eq!(generated_name("2024-03-07", 12), "2024-03-07_sync_12");
    }

    #[test]
    fn timestamps_parse_with_and_without_offset() {
        let zoned = parse_timestamp("2024-05-02T08:00:00+09:00").expect("rfc3339");
        assert_eq!(zoned, datetime!(2024-05-02 08:00 +09:00));

        let naive = parse_timestamp("2024-05-02T08:00:00.123456").expect("naive iso");
        assert_eq!(naive.date(), datetime!(2024-05-02 00:00 UTC).date());
        assert_eq!(naive.hour(), 8);
        assert_eq!(naive.microsecond(), 123_456);

        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn record_serializes_with_all_seven_keys() {
        let record = DocumentRecord {
            original_filename: "notes.txt".into(),
            template_used: "outline".into(),
            processed_at: datetime!(2024-03-07 09:15:30 UTC),
            content: "summary".into(),
            sync_number: 1,
            date: "2024-03-07".into(),
            generated_filename: "2024-03-07_sync_1".into(),
        };
        let value = serde_json::to_value(&record).expect("json");
        let object = value.as_object().expect("object");
        assert_eq!(object.len(), 7);
        assert_eq!(object["processed_at"], "2024-03-07T09:15:30Z");
        assert_eq!(object["sync_number"], 1);
    }
}
