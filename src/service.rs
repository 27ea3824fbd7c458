//! Service layer wiring extraction, summarization, storage and delivery together.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::email::{EmailComposer, EmailContext};
use crate::extract::{EXTRACTION_ERROR_PREFIX, Upload};
use crate::llm::{CompletionKind, chat_client_from_settings};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::publish::{ChannelNotifier, DeliveryReport, IndexPublisher};
use crate::store::{DocumentRecord, DocumentStore, StoreError, WorkspaceOverview};
use crate::summarizer::Summarizer;
use crate::templates::{self, DEFAULT_TEMPLATE};

/// Number of documents shown in "recent documents" views.
pub const RECENT_LIMIT: usize = 3;

/// Errors emitted by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required field was missing or blank.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Template name is not in the catalog.
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),
    /// Email requested for a project without documents.
    #[error("Project '{0}' has no documents")]
    EmptyProject(String),
    /// Filesystem failure in the store.
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Parameters of one ingestion.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Target project, created on first write.
    pub project: String,
    /// Uploaded file.
    pub upload: Upload,
    /// Outline text steering the summary.
    pub outline: String,
    /// Free-text instructions appended to the outline.
    pub instructions: Option<String>,
    /// Whether to push the summary to the knowledge index.
    pub publish: bool,
}

/// Result of a completed ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Project the record was stored in.
    pub project: String,
    /// `{date}_sync_{n}` identifier of the new record.
    pub generated_name: String,
    /// Location of the record file.
    pub path: PathBuf,
    /// Assigned sequence number.
    pub sync_number: u32,
    /// Whether the summary is generated, demo, or an error message.
    pub summary_kind: CompletionKind,
    /// Stored summary text.
    pub summary: String,
    /// Knowledge-index result when publishing was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<DeliveryReport>,
}

/// Parameters of one email composition.
#[derive(Debug, Clone)]
pub struct EmailRequest {
    /// Project whose documents feed the email.
    pub project: String,
    /// Recipient and meeting context.
    pub context: EmailContext,
    /// Whether to post the email to the chat channel.
    pub notify: bool,
}

/// Result of an email composition.
#[derive(Debug, Clone, Serialize)]
pub struct EmailOutcome {
    /// Project the email was built from.
    pub project: String,
    /// Number of documents combined.
    pub document_count: usize,
    /// Whether the email is generated, demo, or an error message.
    pub kind: CompletionKind,
    /// Email text.
    pub email: String,
    /// Chat-channel result when notification was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<DeliveryReport>,
}

/// Pick the outline for an ingestion: a custom outline wins over a catalog name, and the
/// default catalog entry is used when neither is given.
pub fn resolve_outline(
    template: Option<&str>,
    custom_outline: Option<&str>,
) -> Result<String, ServiceError> {
    if let Some(outline) = custom_outline.filter(|outline| !outline.trim().is_empty()) {
        return Ok(outline.to_string());
    }
    let name = template
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_TEMPLATE);
    templates::get(name)
        .map(|entry| entry.outline.to_string())
        .ok_or_else(|| ServiceError::UnknownTemplate(name.to_string()))
}

/// Append free-text instructions to an outline. Blank instructions leave it unchanged.
pub fn apply_instructions(outline: &str, instructions: Option<&str>) -> String {
    match instructions.map(str::trim).filter(|extra| !extra.is_empty()) {
        Some(extra) => format!("{outline}\n\n### Additional instructions\n{extra}"),
        None => outline.to_string(),
    }
}

/// Abstraction over the service used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait DigestApi: Send + Sync {
    /// Extract, summarize, store and optionally publish one upload.
    async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, ServiceError>;

    /// Compose an email from every document of a project.
    async fn compose_email(&self, request: EmailRequest) -> Result<EmailOutcome, ServiceError>;

    /// Names of all projects.
    fn list_projects(&self) -> Result<Vec<String>, ServiceError>;

    /// Records of a project, newest first.
    fn documents(&self, project: &str) -> Result<Vec<DocumentRecord>, ServiceError>;

    /// Delete one record by its generated filename.
    fn delete_document(&self, project: &str, document: &str) -> Result<bool, ServiceError>;

    /// Delete a project with all its records.
    fn delete_project(&self, project: &str) -> Result<bool, ServiceError>;

    /// Per-project and workspace statistics.
    fn overview(&self) -> Result<WorkspaceOverview, ServiceError>;

    /// Current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Owns every component; construct once at process start and share through an `Arc`.
pub struct DigestService {
    store: DocumentStore,
    summarizer: Summarizer,
    composer: EmailComposer,
    publisher: IndexPublisher,
    notifier: ChannelNotifier,
    metrics: Arc<ServiceMetrics>,
}

impl DigestService {
    /// Build every component from configuration.
    pub fn new(config: &Config) -> Self {
        let live = config.llm.is_live();
        if live {
            tracing::info!(model = %config.llm.model, "Language model enabled");
        } else {
            tracing::warn!("OPENAI_API_KEY not set; running in demo mode");
        }

        Self::from_parts(
            DocumentStore::new(config.data_dir.clone()),
            Summarizer::new(chat_client_from_settings(&config.llm)),
            EmailComposer::new(chat_client_from_settings(&config.llm)),
            IndexPublisher::new(&config.index),
            ChannelNotifier::new(&config.channel),
        )
    }

    /// Assemble a service from prebuilt components.
    pub fn from_parts(
        store: DocumentStore,
        summarizer: Summarizer,
        composer: EmailComposer,
        publisher: IndexPublisher,
        notifier: ChannelNotifier,
    ) -> Self {
        Self {
            store,
            summarizer,
            composer,
            publisher,
            notifier,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// The most recent records of a project.
    pub fn recent_documents(&self, project: &str) -> Result<Vec<DocumentRecord>, ServiceError> {
        validate_project(project)?;
        Ok(self.store.recent(project, RECENT_LIMIT)?)
    }

    /// Extract, summarize, store and optionally publish one upload.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, ServiceError> {
        let IngestRequest {
            project,
            upload,
            outline,
            instructions,
            publish,
        } = request;
        validate_project(&project)?;
        require("filename", &upload.filename)?;
        require("template", &outline)?;

        let filename = upload.filename.clone();
        tracing::info!(%project, %filename, size = upload.bytes.len(), "Ingesting upload");

        let text = tokio::task::spawn_blocking(move || upload.extract_text())
            .await
            .unwrap_or_else(|error| format!("{EXTRACTION_ERROR_PREFIX}{error}"));
        let template = apply_instructions(&outline, instructions.as_deref());

        let completion = self.summarizer.summarize(&text, &template).await;
        let saved = self
            .store
            .save(&project, &filename, completion.text(), &template)?;
        self.metrics.record_document(completion.is_failed());

        let publish = if publish {
            let report = self
                .publisher
                .publish(&saved.generated_name, completion.text())
                .await;
            self.metrics.record_delivery(&report);
            Some(report)
        } else {
            None
        };

        Ok(IngestOutcome {
            project,
            generated_name: saved.generated_name,
            path: saved.path,
            sync_number: saved.record.sync_number,
            summary_kind: completion.kind(),
            summary: completion.into_text(),
            publish,
        })
    }

    /// Compose an email from every document of a project, optionally posting it.
    pub async fn compose_email(&self, request: EmailRequest) -> Result<EmailOutcome, ServiceError> {
        let EmailRequest {
            project,
            context,
            notify,
        } = request;
        validate_project(&project)?;

        let documents = self.store.list(&project)?;
        if documents.is_empty() {
            return Err(ServiceError::EmptyProject(project));
        }

        tracing::info!(%project, documents = documents.len(), "Composing email");
        let completion = self.composer.compose(&project, &context, &documents).await;
        self.metrics.record_email(completion.is_failed());

        let notification = if !notify {
            None
        } else if completion.is_failed() {
            Some(DeliveryReport::failure(
                "Email generation failed; nothing was posted",
                None,
            ))
        } else {
            let report = self.notifier.notify(completion.text()).await;
            self.metrics.record_delivery(&report);
            Some(report)
        };

        Ok(EmailOutcome {
            project,
            document_count: documents.len(),
            kind: completion.kind(),
            email: completion.into_text(),
            notification,
        })
    }
}

#[async_trait]
impl DigestApi for DigestService {
    async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, ServiceError> {
        DigestService::ingest(self, request).await
    }

    async fn compose_email(&self, request: EmailRequest) -> Result<EmailOutcome, ServiceError> {
        DigestService::compose_email(self, request).await
    }

    fn list_projects(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.list_projects()?)
    }

    fn documents(&self, project: &str) -> Result<Vec<DocumentRecord>, ServiceError> {
        validate_project(project)?;
        Ok(self.store.list_sorted(project)?)
    }

    fn delete_document(&self, project: &str, document: &str) -> Result<bool, ServiceError> {
        validate_project(project)?;
        Ok(self.store.delete_document(project, document)?)
    }

    fn delete_project(&self, project: &str) -> Result<bool, ServiceError> {
        validate_project(project)?;
        Ok(self.store.delete_all(project)?)
    }

    fn overview(&self) -> Result<WorkspaceOverview, ServiceError> {
        Ok(self.store.overview()?)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Project names become directory names: reject blanks, dot entries and path separators.
pub fn validate_project(project: &str) -> Result<(), ServiceError> {
    require("project", project)?;
    if project == "." || project == ".." || project.contains(['/', '\\']) {
        return Err(ServiceError::InvalidRequest(format!(
            "project name '{project}' is not a valid directory name"
        )));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        Err(ServiceError::InvalidRequest(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelSettings, IndexSettings};
    use crate::llm::{ChatClient, ChatRequest, LlmError};
    use tempfile::TempDir;

    struct FailingClient;

    #[async_trait]
    impl ChatClient for FailingClient {
        async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
            Err(LlmError::ProviderUnavailable("offline".into()))
        }
    }

    fn demo_service(dir: &TempDir) -> DigestService {
        DigestService::new(&Config {
            data_dir: dir.path().join("tf_projects"),
            ..Config::default()
        })
    }

    fn upload(name: &str, body: &str) -> Upload {
        Upload::new(name, Some("text/plain".into()), body.as_bytes().to_vec())
    }

    fn ingest_request(project: &str, name: &str, body: &str) -> IngestRequest {
        IngestRequest {
            project: project.into(),
            upload: upload(name, body),
            outline: "outline A".into(),
            instructions: None,
            publish: false,
        }
    }

    #[test]
    fn outline_resolution_prefers_custom_text() {
        assert_eq!(
            resolve_outline(Some("meeting_minutes"), Some("my outline")).expect("outline"),
            "my outline"
        );
        let default = resolve_outline(None, Some("  ")).expect("default");
        assert_eq!(default, templates::get(DEFAULT_TEMPLATE).expect("entry").outline);
        assert!(matches!(
            resolve_outline(Some("haiku"), None),
            Err(ServiceError::UnknownTemplate(name)) if name == "haiku"
        ));
    }

    #[test]
    fn instructions_are_appended_after_the_outline() {
        let outline = templates::get("meeting_minutes").expect("template").outline;
        let combined = apply_instructions(outline, Some("  Keep it under one page. "));
        assert!(combined.starts_with(outline));
        assert!(combined.contains("### Additional instructions"));
        assert!(combined.ends_with("Keep it under one page."));
        assert_eq!(apply_instructions(outline, Some("   ")), outline);
        assert_eq!(apply_instructions(outline, None), outline);
        assert!(
            !templates::entries()
                .iter()
                .any(|entry| entry.outline.contains("Additional instructions"))
        );
    }

    #[test]
    fn path_like_project_names_are_rejected() {
        for name in ["", " ", ".", "..", "a/b", "..\\up", "/etc"] {
            assert!(validate_project(name).is_err(), "{name:?} accepted");
        }
        assert!(validate_project("Q3 launch").is_ok());
    }

    #[tokio::test]
    async fn ingest_stores_demo_summary() {
        let dir = TempDir::new().expect("temp dir");
        let service = demo_service(&dir);

        let outcome = service
            .ingest(IngestRequest {
                instructions: Some("Focus on risks".into()),
                ..ingest_request("alpha", "notes.txt", "kickoff call")
            })
            .await
            .expect("ingest");

        assert_eq!(outcome.sync_number, 1);
        assert_eq!(outcome.summary_kind, CompletionKind::Demo);
        assert!(outcome.summary.contains("kickoff call"));
        assert!(outcome.publish.is_none());

        let records = service.documents("alpha").expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, outcome.summary);
        assert!(records[0].template_used.starts_with("outline A"));
        assert!(records[0].template_used.ends_with("Focus on risks"));
        assert_eq!(service.metrics_snapshot().documents_ingested, 1);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let service = demo_service(&dir);
        let error = service
            .ingest(ingest_request("  ", "notes.txt", "x"))
            .await
            .expect_err("blank project");
        assert!(matches!(error, ServiceError::InvalidRequest(_)));
        assert!(service.list_projects().expect("projects").is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_still_persisted() {
        let dir = TempDir::new().expect("temp dir");
        let service = DigestService::from_parts(
            DocumentStore::new(dir.path()),
            Summarizer::new(Some(Box::new(FailingClient))),
            EmailComposer::new(None),
            IndexPublisher::new(&IndexSettings::default()),
            ChannelNotifier::new(&ChannelSettings::default()),
        );

        let outcome = service
            .ingest(ingest_request("alpha", "notes.txt", "body"))
            .await
            .expect("ingest");
        assert_eq!(outcome.summary_kind, CompletionKind::Failed);
        assert!(outcome.summary.contains("offline"));
        assert_eq!(service.documents("alpha").expect("records").len(), 1);
        assert_eq!(service.metrics_snapshot().provider_failures, 1);
    }

    #[tokio::test]
    async fn publish_without_configuration_reports_demo() {
        let dir = TempDir::new().expect("temp dir");
        let service = demo_service(&dir);
        let outcome = service
            .ingest(IngestRequest {
                publish: true,
                ..ingest_request("alpha", "notes.txt", "body")
            })
            .await
            .expect("ingest");
        let report = outcome.publish.expect("publish report");
        assert!(report.demo && !report.success);
        assert_eq!(service.metrics_snapshot().deliveries_attempted, 0);
    }

    #[tokio::test]
    async fn email_requires_documents() {
        let dir = TempDir::new().expect("temp dir");
        let service = demo_service(&dir);
        let error = service
            .compose_email(EmailRequest {
                project: "ghost".into(),
                context: EmailContext::default(),
                notify: false,
            })
            .await
            .expect_err("no documents");
        assert!(matches!(error, ServiceError::EmptyProject(project) if project == "ghost"));
    }

    #[tokio::test]
    async fn email_with_notify_reports_unconfigured_channel() {
        let dir = TempDir::new().expect("temp dir");
        let service = demo_service(&dir);
        service
            .ingest(ingest_request("alpha", "a.txt", "first"))
            .await
            .expect("ingest");

        let outcome = service
            .compose_email(EmailRequest {
                project: "alpha".into(),
                context: EmailContext {
                    recipient_name: "Sam".into(),
                    ..EmailContext::default()
                },
                notify: true,
            })
            .await
            .expect("email");
        assert_eq!(outcome.document_count, 1);
        assert_eq!(outcome.kind, CompletionKind::Demo);
        assert!(outcome.notification.expect("notification").demo);
    }
}
