//! Flat-file project store.
//!
//! Layout: `{root}/{project}/{date}_sync_{n}.txt`, each file holding one JSON
//! [`DocumentRecord`]. A project exists iff its directory exists. Project names are used
//! verbatim as directory names.
//!
//! There is no locking. `sync_number` is derived from the number of records present at
//! write time, so two concurrent writers may race for the same number; files are opened
//! with create-new semantics and the loser moves on to the next free number instead of
//! overwriting.

mod types;

pub use types::{
    DocumentRecord, ProjectSummary, SavedDocument, StoreError, WorkspaceOverview, calendar_date,
    generated_name, now,
};

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

const RECORD_EXTENSION: &str = "txt";

/// Filesystem-backed store of per-project document records.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Create a store rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding every project.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing `project`.
    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    /// Persist a new record for `project`, creating the project on first write.
    pub fn save(
        &self,
        project: &str,
        filename: &str,
        content: &str,
        template: &str,
    ) -> Result<SavedDocument, StoreError> {
        self.save_at(project, filename, content, template, now())
    }

    pub(crate) fn save_at(
        &self,
        project: &str,
        filename: &str,
        content: &str,
        template: &str,
        processed_at: OffsetDateTime,
    ) -> Result<SavedDocument, StoreError> {
        let dir = self.project_dir(project);
        fs::create_dir_all(&dir).map_err(StoreError::io(&dir))?;

        let date = calendar_date(processed_at);
        let existing = self.record_paths(project)?.len();
        let mut sync_number = u32::try_from(existing).unwrap_or(u32::MAX - 1) + 1;

        loop {
            let name = generated_name(&date, sync_number);
            let path = dir.join(format!("{name}.{RECORD_EXTENSION}"));
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(project, name, "Record name taken; advancing sync number");
                    sync_number += 1;
                    continue;
                }
                Err(error) => return Err(StoreError::io(&path)(error)),
            };

            let record = DocumentRecord {
                original_filename: filename.to_string(),
                template_used: template.to_string(),
                processed_at,
                content: content.to_string(),
                sync_number,
                date: date.clone(),
                generated_filename: name.clone(),
            };
            let encoded = serde_json::to_vec_pretty(&record)?;
            file.write_all(&encoded).map_err(StoreError::io(&path))?;

            tracing::info!(
                project,
                original_filename = filename,
                sync_number,
                path = %path.display(),
                "Stored document record"
            );
            return Ok(SavedDocument {
                path,
                generated_name: name,
                record,
            });
        }
    }

    /// Every readable record of `project`, in file-name order.
    ///
    /// Returns an empty list when the project does not exist. Files that do not parse as a
    /// record are skipped.
    pub fn list(&self, project: &str) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut records = Vec::new();
        for path in self.record_paths(project)? {
            let bytes = fs::read(&path).map_err(StoreError::io(&path))?;
            match serde_json::from_slice::<DocumentRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(error) => {
                    tracing::debug!(path = %path.display(), error = %error, "Skipping unreadable record");
                }
            }
        }
        Ok(records)
    }

    /// Records of `project`, newest `processed_at` first.
    pub fn list_sorted(&self, project: &str) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut records = self.list(project)?;
        records.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(records)
    }

    /// The `limit` most recent records of `project`.
    pub fn recent(&self, project: &str, limit: usize) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut records = self.list_sorted(project)?;
        records.truncate(limit);
        Ok(records)
    }

    /// Look up a record by its generated filename.
    pub fn find(
        &self,
        project: &str,
        generated_filename: &str,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(self
            .list(project)?
            .into_iter()
            .find(|record| record.generated_filename == generated_filename))
    }

    /// Names of every project directory, sorted. Empty when the root does not exist.
    pub fn list_projects(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(StoreError::io(&self.root)(error)),
        };

        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::io(&self.root))?;
            let file_type = entry.file_type().map_err(StoreError::io(&entry.path()))?;
            if file_type.is_dir() {
                projects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Delete the record whose generated filename is `generated_filename`.
    ///
    /// Returns `false` when no such record exists.
    pub fn delete_document(
        &self,
        project: &str,
        generated_filename: &str,
    ) -> Result<bool, StoreError> {
        let stem = generated_filename
            .strip_suffix(".txt")
            .unwrap_or(generated_filename);
        if stem.is_empty() || stem.contains(['/', '\\']) || stem == "." || stem == ".." {
            return Err(StoreError::InvalidIdentifier(generated_filename.to_string()));
        }

        let path = self
            .project_dir(project)
            .join(format!("{stem}.{RECORD_EXTENSION}"));
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(project, document = stem, "Deleted document record");
                Ok(true)
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(StoreError::io(&path)(error)),
        }
    }

    /// Delete the record at `index` in file-name order.
    ///
    /// The index is only meaningful relative to a listing taken by the caller just before;
    /// a concurrent delete shifts positions. Prefer [`Self::delete_document`].
    pub fn delete_at(&self, project: &str, index: usize) -> Result<bool, StoreError> {
        let paths = self.record_paths(project)?;
        let Some(path) = paths.get(index) else {
            return Ok(false);
        };
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(project, index, path = %path.display(), "Deleted document record by position");
                Ok(true)
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(StoreError::io(path)(error)),
        }
    }

    /// Remove every record of `project`, then the project directory itself.
    ///
    /// Returns `false` when the project never existed.
    pub fn delete_all(&self, project: &str) -> Result<bool, StoreError> {
        let dir = self.project_dir(project);
        if !dir.is_dir() {
            return Ok(false);
        }

        let paths = self.record_paths(project)?;
        for path in &paths {
            fs::remove_file(path).map_err(StoreError::io(path))?;
        }
        fs::remove_dir_all(&dir).map_err(StoreError::io(&dir))?;
        tracing::info!(project, removed = paths.len(), "Deleted project");
        Ok(true)
    }

    /// Document count and latest update for one project.
    pub fn project_summary(&self, project: &str) -> Result<ProjectSummary, StoreError> {
        let records = self.list(project)?;
        Ok(ProjectSummary {
            name: project.to_string(),
            document_count: records.len(),
            latest_update: records.iter().map(|record| record.processed_at).max(),
        })
    }

    /// Statistics across every project.
    pub fn overview(&self) -> Result<WorkspaceOverview, StoreError> {
        let projects = self
            .list_projects()?
            .iter()
            .map(|name| self.project_summary(name))
            .collect::<Result<Vec<_>, _>>()?;
        let total_documents: usize = projects.iter().map(|summary| summary.document_count).sum();
        let average_documents = if projects.is_empty() {
            0.0
        } else {
            total_documents as f64 / projects.len() as f64
        };
        Ok(WorkspaceOverview {
            projects,
            total_documents,
            average_documents,
        })
    }

    fn record_paths(&self, project: &str) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.project_dir(project);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(StoreError::io(&dir)(error)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(StoreError::io(&dir))?.path();
            let is_record = path.is_file()
                && path
                    .extension()
                    .is_some_and(|extension| extension == RECORD_EXTENSION);
            if is_record {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use tempfile::TempDir;
    use time::macros::datetime;

    fn store() -> (TempDir, DocumentStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = DocumentStore::new(dir.path().join("tf_projects"));
        (dir, store)
    }

    #[test]
    fn missing_root_lists_nothing() {
        let (_dir, store) = store();
        assert!(store.list_projects().expect("projects").is_empty());
        assert!(store.list("ghost").expect("records").is_empty());
        assert!(!store.delete_all("ghost").expect("delete"));
    }

    #[test]
    fn sequential_saves_number_from_one() {
        let (_dir, store) = store();
        let mut names = Vec::new();
        for i in 0..4 {
            let saved = store
                .save("alpha", &format!("call-{i}.txt"), "summary", "outline")
                .expect("save");
            assert_eq!(saved.record.sync_number, i + 1);
            assert!(saved.path.exists());
            names.push(saved.generated_name);
        }
        names.dedup();
        assert_eq!(names.len(), 4);

        let mut numbers: Vec<u32> = store
            .list("alpha")
            .expect("records")
            .iter()
            .map(|record| record.sync_number)
            .collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn generated_name_follows_date_and_sequence() {
        let (_dir, store) = store();
        let saved = store
            .save_at(
                "alpha",
                "notes.txt",
                "summary",
                "outline",
                datetime!(2024-05-02 08:00 UTC),
            )
            .expect("save");
        assert_eq!(saved.generated_name, "2024-05-02_sync_1");
        assert_eq!(saved.record.date, "2024-05-02");
        assert_eq!(
            saved.path.file_name().and_then(|name| name.to_str()),
            Some("2024-05-02_sync_1.txt")
        );

        let pattern = Regex::new(r"^\d{4}-\d{2}-\d{2}_sync_\d+$").expect("regex");
        let saved = store
            .save("alpha", "more.txt", "summary", "outline")
            .expect("save");
        assert!(pattern.is_match(&saved.generated_name));
    }

    #[test]
    fn listing_round_trips_every_field() {
        let (_dir, store) = store();
        let saved = store
            .save("alpha", "notes.txt", "kickoff call · 회의록", "outline A")
            .expect("save");
        let records = store.list("alpha").expect("records");
        assert_eq!(records, vec![saved.record]);
    }

    #[test]
    fn unparseable_files_are_skipped() {
        let (_dir, store) = store();
        store
            .save("alpha", "notes.txt", "summary", "outline")
            .expect("save");
        let dir = store.project_dir("alpha");
        fs::write(dir.join("garbage.txt"), "not json").expect("write garbage");
        fs::write(dir.join("other.json"), "{}").expect("write non-record");

        let records = store.list("alpha").expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original_filename, "notes.txt");
    }

    #[test]
    fn records_without_offset_are_listed_and_counted() {
        let (_dir, store) = store();
        let dir = store.project_dir("legacy");
        fs::create_dir_all(&dir).expect("project dir");
        let raw = serde_json::json!({
            "original_filename": "minutes.md",
            "template_used": "outline",
            "processed_at": "2024-05-02T08:00:00.123456",
            "content": "older summary",
            "sync_number": 1,
            "date": "2024-05-02",
            "generated_filename": "2024-05-02_sync_1",
        });
        fs::write(dir.join("2024-05-02_sync_1.txt"), raw.to_string()).expect("write record");

        let records = store.list("legacy").expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].processed_at.hour(), 8);
        assert_eq!(records[0].content, "older summary");

        let summary = store.project_summary("legacy").expect("summary");
        assert_eq!(summary.document_count, 1);
        assert!(summary.latest_update.is_some());

        let saved = store
            .save("legacy", "next.md", "newer summary", "outline")
            .expect("save");
        assert_eq!(saved.record.sync_number, 2);
    }

    #[test]
    fn taken_names_advance_the_sequence() {
        let (_dir, store) = store();
        let when = datetime!(2024-05-02 08:00 UTC);
        let first = store
            .save_at("alpha", "a.txt", "one", "outline", when)
            .expect("save");
        store
            .save_at("alpha", "b.txt", "two", "outline", when)
            .expect("save");
        assert!(
            store
                .delete_document("alpha", &first.generated_name)
                .expect("delete")
        );

        // One record left, so the count suggests 2, which is still on disk.
        let third = store
            .save_at("alpha", "c.txt", "three", "outline", when)
            .expect("save");
        assert_eq!(third.record.sync_number, 3);
        assert_eq!(store.list("alpha").expect("records").len(), 2);
    }

    #[test]
    fn delete_document_by_identity() {
        let (_dir, store) = store();
        let saved = store
            .save("alpha", "notes.txt", "summary", "outline")
            .expect("save");
        assert!(
            store
                .delete_document("alpha", &saved.generated_name)
                .expect("delete")
        );
        assert!(
            !store
                .delete_document("alpha", &saved.generated_name)
                .expect("second delete")
        );
        assert!(matches!(
            store.delete_document("alpha", "../escape"),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn delete_at_uses_listing_position() {
        let (_dir, store) = store();
        let when = datetime!(2024-05-02 08:00 UTC);
        for name in ["a.txt", "b.txt", "c.txt"] {
            store
                .save_at("alpha", name, "summary", "outline", when)
                .expect("save");
        }
        assert!(!store.delete_at("alpha", 3).expect("out of range"));
        assert!(store.delete_at("alpha", 1).expect("delete"));

        let remaining: Vec<String> = store
            .list("alpha")
            .expect("records")
            .into_iter()
            .map(|record| record.original_filename)
            .collect();
        assert_eq!(remaining, vec!["a.txt".to_string(), "c.txt".to_string()]);
    }

    #[test]
    fn delete_all_removes_project() {
        let (_dir, store) = store();
        store
            .save("alpha", "notes.txt", "summary", "outline")
            .expect("save");
        store
            .save("beta", "notes.txt", "summary", "outline")
            .expect("save");
        assert_eq!(
            store.list_projects().expect("projects"),
            vec!["alpha".to_string(), "beta".to_string()]
        );

        assert!(store.delete_all("alpha").expect("delete"));
        assert_eq!(
            store.list_projects().expect("projects"),
            vec!["beta".to_string()]
        );
        assert!(!store.project_dir("alpha").exists());
    }

    #[test]
    fn recent_returns_newest_first() {
        let (_dir, store) = store();
        let times = [
            datetime!(2024-05-01 08:00 UTC),
            datetime!(2024-05-03 08:00 UTC),
            datetime!(2024-05-02 08:00 UTC),
            datetime!(2024-04-30 08:00 UTC),
        ];
        for (i, when) in times.into_iter().enumerate() {
            store
                .save_at("alpha", &format!("{i}.txt"), "summary", "outline", when)
                .expect("save");
        }

        let recent: Vec<String> = store
            .recent("alpha", 3)
            .expect("recent")
            .into_iter()
            .map(|record| record.date)
            .collect();
        assert_eq!(recent, vec!["2024-05-03", "2024-05-02", "2024-05-01"]);
    }

    #[test]
    fn overview_aggregates_projects() {
        let (_dir, store) = store();
        let latest = datetime!(2024-05-03 08:00 UTC);
        store
            .save_at("alpha", "a.txt", "s", "o", datetime!(2024-05-01 08:00 UTC))
            .expect("save");
        store
            .save_at("alpha", "b.txt", "s", "o", latest)
            .expect("save");
        fs::create_dir_all(store.project_dir("empty")).expect("empty project");

        let overview = store.overview().expect("overview");
        assert_eq!(overview.projects.len(), 2);
        assert_eq!(overview.total_documents, 2);
        assert!((overview.average_documents - 1.0).abs() < f64::EPSILON);
        assert_eq!(overview.projects[0].latest_update, Some(latest));
        assert_eq!(overview.projects[1].name, "empty");
        assert_eq!(overview.projects[1].latest_update, None);
    }
}
