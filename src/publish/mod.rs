//! One-shot deliveries to external services: the knowledge index and the chat channel.
//!
//! Both make a single attempt and report the outcome as a [`DeliveryReport`] instead of an
//! error. Missing credentials short-circuit to a "not configured" report with `demo` set and
//! no network traffic.

mod index;
mod notify;

pub use index::IndexPublisher;
pub use notify::ChannelNotifier;

use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Whether the remote service accepted the payload.
    pub success: bool,
    /// True when the service is not configured and no request was made.
    pub demo: bool,
    /// Human-readable outcome.
    pub message: String,
    /// HTTP status of the final response, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Identifier assigned by the knowledge index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Indexing batch tag returned by the knowledge index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
}

impl DeliveryReport {
    pub(crate) fn not_configured(message: impl Into<String>) -> Self {
        Self {
            demo: true,
            message: message.into(),
            ..Self::default()
        }
    }

    pub(crate) fn failure(message: impl Into<String>, status: Option<StatusCode>) -> Self {
        Self {
            message: message.into(),
            status: status.map(|status| status.as_u16()),
            ..Self::default()
        }
    }
}

/// Map a request that never produced a response into a report.
pub(crate) fn transport_failure(
    service: &str,
    target: &str,
    timeout: Duration,
    error: &reqwest::Error,
) -> DeliveryReport {
    let message = if error.is_timeout() {
        format!("{service} did not respond within {timeout:?}")
    } else if error.is_connect() {
        format!("Could not connect to {service} at {target}; the connection was refused")
    } else {
        format!("{service} request failed: {error}")
    };
    tracing::warn!(service, target, error = %error, "Delivery failed before a response");
    DeliveryReport::failure(message, None)
}

/// Map a non-success response into a report.
pub(crate) fn status_failure(
    service: &str,
    status: StatusCode,
    body: &str,
    not_found: &str,
) -> DeliveryReport {
    let message = match status {
        StatusCode::UNAUTHORIZED => {
            format!("{service} rejected the credentials (401); check the configured API key")
        }
        StatusCode::NOT_FOUND => format!("{service} returned 404: {not_found}"),
        other => format!("{service} returned unexpected status {other}: {body}"),
    };
    tracing::warn!(service, status = %status, "Delivery rejected");
    DeliveryReport::failure(message, Some(status))
}
