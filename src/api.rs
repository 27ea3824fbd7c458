//! HTTP surface for the meeting digest service.
//!
//! - `GET /projects` – Project names.
//! - `GET /overview` – Per-project document counts and last update, plus totals.
//! - `GET /projects/:project/documents` – Records of a project, newest first (`?limit=` trims).
//! - `POST /projects/:project/documents` – Upload raw file bytes. Query parameters carry the
//!   `filename`, an optional catalog `template` or custom `outline`, extra `instructions` and
//!   a `publish` flag; `Content-Type` is used as the MIME hint.
//! - `DELETE /projects/:project/documents/:document` – Delete one record by generated name.
//! - `DELETE /projects/:project` – Delete a project and all of its records.
//! - `POST /projects/:project/email` – Compose an email from every record of a project.
//! - `GET /templates`, `GET /metrics`, `GET /commands` – Catalog, counters and discovery.

use crate::email::EmailContext;
use crate::extract::Upload;
use crate::metrics::MetricsSnapshot;
use crate::service::{
    DigestApi, EmailOutcome, EmailRequest, IngestOutcome, IngestRequest, ServiceError,
    resolve_outline,
};
use crate::store::{DocumentRecord, StoreError, WorkspaceOverview};
use crate::templates::{self, Template};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the HTTP router exposing the digest API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DigestApi + 'static,
{
    Router::new()
        .route("/projects", get(list_projects::<S>))
        .route("/overview", get(get_overview::<S>))
        .route("/projects/:project", delete(delete_project::<S>))
        .route(
            "/projects/:project/documents",
            get(list_documents::<S>).post(ingest_document::<S>),
        )
        .route(
            "/projects/:project/documents/:document",
            delete(delete_document::<S>),
        )
        .route("/projects/:project/email", post(compose_email::<S>))
        .route("/templates", get(list_templates))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Response body for `GET /projects`.
#[derive(Serialize)]
struct ProjectsResponse {
    projects: Vec<String>,
}

async fn list_projects<S>(State(service): State<Arc<S>>) -> Result<Json<ProjectsResponse>, AppError>
where
    S: DigestApi,
{
    let projects = service.list_projects()?;
    Ok(Json(ProjectsResponse { projects }))
}

async fn get_overview<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<WorkspaceOverview>, AppError>
where
    S: DigestApi,
{
    Ok(Json(service.overview()?))
}

/// Query parameters for `GET /projects/:project/documents`.
#[derive(Deserialize)]
struct DocumentsQuery {
    /// Keep only the newest `limit` records.
    #[serde(default)]
    limit: Option<usize>,
}

/// Response body for `GET /projects/:project/documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    project: String,
    documents: Vec<DocumentRecord>,
}

async fn list_documents<S>(
    State(service): State<Arc<S>>,
    Path(project): Path<String>,
    Query(query): Query<DocumentsQuery>,
) -> Result<Json<DocumentsResponse>, AppError>
where
    S: DigestApi,
{
    let mut documents = service.documents(&project)?;
    if let Some(limit) = query.limit {
        documents.truncate(limit);
    }
    Ok(Json(DocumentsResponse { project, documents }))
}

/// Query parameters for `POST /projects/:project/documents`.
#[derive(Deserialize)]
struct IngestQuery {
    /// Original filename; its extension drives format detection.
    filename: String,
    /// Catalog template name (defaults to `business_plan`).
    #[serde(default)]
    template: Option<String>,
    /// Custom outline; wins over `template` when both are given.
    #[serde(default)]
    outline: Option<String>,
    /// Extra instructions appended to the outline.
    #[serde(default)]
    instructions: Option<String>,
    /// Push the summary to the knowledge index after saving.
    #[serde(default)]
    publish: bool,
}

/// Extract, summarize and store one uploaded file.
async fn ingest_document<S>(
    State(service): State<Arc<S>>,
    Path(project): Path<String>,
    Query(query): Query<IngestQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestOutcome>, AppError>
where
    S: DigestApi,
{
    let IngestQuery {
        filename,
        template,
        outline,
        instructions,
        publish,
    } = query;
    let outline = resolve_outline(template.as_deref(), outline.as_deref())?;
    let mime_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let outcome = service
        .ingest(IngestRequest {
            project,
            upload: Upload::new(filename, mime_type, body.to_vec()),
            outline,
            instructions: instructions.filter(|text| !text.trim().is_empty()),
            publish,
        })
        .await?;
    tracing::info!(
        project = %outcome.project,
        document = %outcome.generated_name,
        kind = ?outcome.summary_kind,
        "Ingest request completed"
    );
    Ok(Json(outcome))
}

async fn delete_document<S>(
    State(service): State<Arc<S>>,
    Path((project, document)): Path<(String, String)>,
) -> Result<StatusCode, AppError>
where
    S: DigestApi,
{
    if service.delete_document(&project, &document)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Document '{document}' not found in project '{project}'"
        )))
    }
}

async fn delete_project<S>(
    State(service): State<Arc<S>>,
    Path(project): Path<String>,
) -> Result<StatusCode, AppError>
where
    S: DigestApi,
{
    if service.delete_project(&project)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Project '{project}' not found")))
    }
}

/// Request body for `POST /projects/:project/email`.
#[derive(Deserialize)]
struct EmailBody {
    #[serde(flatten)]
    context: EmailContext,
    /// Post the email to the chat channel.
    #[serde(default)]
    notify: bool,
}

async fn compose_email<S>(
    State(service): State<Arc<S>>,
    Path(project): Path<String>,
    Json(body): Json<EmailBody>,
) -> Result<Json<EmailOutcome>, AppError>
where
    S: DigestApi,
{
    let outcome = service
        .compose_email(EmailRequest {
            project,
            context: body.context,
            notify: body.notify,
        })
        .await?;
    Ok(Json(outcome))
}

/// Response body for `GET /templates`.
#[derive(Serialize)]
struct TemplatesResponse {
    default: &'static str,
    templates: &'static [Template],
}

async fn list_templates() -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        default: templates::DEFAULT_TEMPLATE,
        templates: templates::entries(),
    })
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DigestApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ingest",
                method: "POST",
                path: "/projects/:project/documents",
                description: "Upload a .txt, .md, .pdf or .docx file as the raw body. Query: filename (required), template or outline, instructions, publish. Returns the generated name and summary.",
                request_example: Some(json!({
                    "query": "filename=weekly.docx&template=meeting_minutes&publish=false",
                    "content_type": "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                })),
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/projects/:project/documents",
                description: "Return the records of a project, newest first. Optional ?limit=N.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_projects",
                method: "GET",
                path: "/projects",
                description: "Return the names of all projects.",
                request_example: None,
            },
            CommandDescriptor {
                name: "overview",
                method: "GET",
                path: "/overview",
                description: "Return document counts and last update per project, plus workspace totals.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_document",
                method: "DELETE",
                path: "/projects/:project/documents/:document",
                description: "Delete one record by its generated name, e.g. 2024-05-02_sync_1.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_project",
                method: "DELETE",
                path: "/projects/:project",
                description: "Delete a project and every record in it.",
                request_example: None,
            },
            CommandDescriptor {
                name: "compose_email",
                method: "POST",
                path: "/projects/:project/email",
                description: "Compose an email from every record of a project; notify posts it to the chat channel.",
                request_example: Some(json!({
                    "meeting_subject": "Weekly sync",
                    "organization": "Acme",
                    "organization_role": "Design partner",
                    "recipient_name": "Sam",
                    "recipient_role": "Engineer",
                    "notify": false
                })),
            },
            CommandDescriptor {
                name: "templates",
                method: "GET",
                path: "/templates",
                description: "Return the built-in summary outlines.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion, email and delivery counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Service(ServiceError),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) | Self::Service(ServiceError::EmptyProject(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Service(
                ServiceError::InvalidRequest(_)
                | ServiceError::UnknownTemplate(_)
                | ServiceError::Store(StoreError::InvalidIdentifier(_)),
            ) => StatusCode::BAD_REQUEST,
            Self::Service(ServiceError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match self {
            Self::Service(error) => {
                if status.is_server_error() {
                    tracing::error!(error = %error, "Request failed");
                }
                error.to_string()
            }
            Self::NotFound(message) => message,
        };
        (status, message).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        Self::Service(inner)
    }
}
