#![deny(missing_docs)]

//! Core library for tf-digest: meeting transcripts in, structured summaries and emails out.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration.
pub mod config;
/// Recipient-targeted email composition.
pub mod email;
/// Plain-text extraction from uploaded files.
pub mod extract;
/// Language-model provider boundary.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Service activity counters.
pub mod metrics;
/// Knowledge-index publishing and chat-channel notification.
pub mod publish;
/// Ingestion and email orchestration.
pub mod service;
/// Flat-file document store.
pub mod store;
/// Template-driven summarization.
pub mod summarizer;
/// Built-in summary outlines.
pub mod templates;
