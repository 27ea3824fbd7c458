//! Knowledge-index publisher: pushes a finished summary into a dataset as a text document.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;

use super::{DeliveryReport, status_failure, transport_failure};
use crate::config::IndexSettings;

const SERVICE: &str = "Knowledge index";
const TIMEOUT: Duration = Duration::from_secs(60);

/// Publishes documents to `{base_url}/datasets/{dataset_id}/docs/text`.
pub struct IndexPublisher {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    dataset_id: Option<String>,
    timeout: Duration,
}

impl IndexPublisher {
    /// Build a publisher from settings; missing credentials are reported at publish time.
    pub fn new(settings: &IndexSettings) -> Self {
        Self::with_timeout(settings, TIMEOUT)
    }

    /// Like [`IndexPublisher::new`] with a custom per-request timeout.
    pub fn with_timeout(settings: &IndexSettings, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("tf-digest/index")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(error = %error, "Falling back to default HTTP client for index");
                Client::new()
            });
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            dataset_id: settings.dataset_id.clone(),
            timeout,
        }
    }

    /// Whether both the credential and the dataset are configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.dataset_id.is_some()
    }

    /// Publish `text` as a document called `name`. One attempt, no retry.
    pub async fn publish(&self, name: &str, text: &str) -> DeliveryReport {
        let (Some(api_key), Some(dataset_id)) = (&self.api_key, &self.dataset_id) else {
            tracing::debug!("Knowledge index not configured; skipping publish");
            return DeliveryReport::not_configured(
                "Knowledge index is not configured: set INDEX_API_KEY and INDEX_DATASET_ID",
            );
        };

        if let Err(error) = self.http.get(&self.base_url).send().await {
            return transport_failure(SERVICE, &self.base_url, self.timeout, &error);
        }

        let endpoint = format!("{}/datasets/{dataset_id}/docs/text", self.base_url);
        let body = json!({
            "name": name,
            "text": text,
            "indexing_type": "high_quality",
            "process_rule": { "mode": "automatic" },
        });
        let response = match self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return transport_failure(SERVICE, &endpoint, self.timeout, &error),
        };

        let status = response.status();
        let payload = response.text().await.unwrap_or_default();
        if status != StatusCode::OK {
            return status_failure(
                SERVICE,
                status,
                &payload,
                &format!("dataset {dataset_id} was not found"),
            );
        }

        let parsed: Value = serde_json::from_str(&payload).unwrap_or(Value::Null);
        let document_id = parsed
            .pointer("/document/id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let batch = parsed
            .get("batch")
            .and_then(Value::as_str)
            .map(str::to_string);
        tracing::info!(name, ?document_id, ?batch, "Published document to knowledge index");

        DeliveryReport {
            success: true,
            demo: false,
            message: format!("Published \"{name}\" to dataset {dataset_id}"),
            status: Some(status.as_u16()),
            document_id,
            batch,
        }
    }
}
