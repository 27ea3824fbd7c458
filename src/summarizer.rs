//! Template-driven summarization of extracted transcripts.

use crate::llm::{ChatClient, ChatMessage, ChatRequest, Completion};

const MAX_OUTPUT_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;
const PREVIEW_CHARS: usize = 100;

/// Label opening every demo-mode summary.
pub const DEMO_LABEL: &str = "[Demo mode - a real OPENAI_API_KEY is required]";

const FAILURE_CONTEXT: &str = "An error occurred while processing with the language model";

/// Structures raw text according to a template outline.
pub struct Summarizer {
    client: Option<Box<dyn ChatClient>>,
}

impl Summarizer {
    /// `None` selects demo mode.
    pub fn new(client: Option<Box<dyn ChatClient>>) -> Self {
        Self { client }
    }

    /// Whether a live provider is attached.
    pub fn is_live(&self) -> bool {
        self.client.is_some()
    }

    /// Summarize `raw_text` following `template`. Never fails; see [`Completion`].
    pub async fn summarize(&self, raw_text: &str, template: &str) -> Completion {
        let Some(client) = &self.client else {
            tracing::debug!("No language model credential; returning demo summary");
            return Completion::Demo(demo_summary(raw_text));
        };

        let request = ChatRequest {
            messages: build_messages(raw_text, template),
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };
        Completion::from_provider(client.complete(request).await, FAILURE_CONTEXT)
    }
}

fn build_messages(raw_text: &str, template: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "Organize and structure the provided content using the following template:\n\n{template}"
        )),
        ChatMessage::user(format!(
            "Organize the following content to fit the template above:\n\n{raw_text}"
        )),
    ]
}

/// Canned summary embedding the first 100 characters of the input.
pub fn demo_summary(raw_text: &str) -> String {
    let preview: String = raw_text.chars().take(PREVIEW_CHARS).collect();
    format!(
        "{DEMO_LABEL}

Example of content organized by the template (demo output, not a real summary):

1. Project overview
   - Uploaded file: {preview}...

2. Key features
   - Features extracted from the file will appear here

3. Technology stack
   - The analyzed technology stack will appear here

4. Expected schedule
   - The schedule estimated by the model will appear here

5. Risk factors
   - Identified risks will appear here

6. Success metrics
   - Defined success metrics will appear here

Set OPENAI_API_KEY in the .env file to generate real summaries."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRole, CompletionKind, LlmError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct RecordingClient {
        requests: Arc<Mutex<Vec<ChatRequest>>>,
        reply: Result<String, LlmError>,
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
            self.requests.lock().expect("lock").push(request);
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn demo_mode_embeds_first_hundred_characters() {
        let summarizer = Summarizer::new(None);
        let input = "가".repeat(150);
        let completion = summarizer.summarize(&input, "outline").await;

        assert_eq!(completion.kind(), CompletionKind::Demo);
        let expected: String = input.chars().take(100).collect();
        assert!(completion.text().contains(&expected));
        assert!(!completion.text().contains(&"가".repeat(101)));
        assert!(completion.text().starts_with(DEMO_LABEL));
    }

    #[tokio::test]
    async fn demo_mode_handles_short_input() {
        let completion = Summarizer::new(None).summarize("kickoff call", "outline").await;
        assert!(completion.text().contains("kickoff call"));
    }

    #[tokio::test]
    async fn live_mode_sends_template_and_text() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let summarizer = Summarizer::new(Some(Box::new(RecordingClient {
            requests: requests.clone(),
            reply: Ok("structured".into()),
        })));

        let completion = summarizer.summarize("raw transcript", "## Outline").await;
        assert_eq!(completion, Completion::Generated("structured".into()));

        let requests = requests.lock().expect("lock");
        let request = &requests[0];
        assert_eq!(request.max_tokens, 2000);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert!(request.messages[0].content.contains("## Outline"));
        assert_eq!(request.messages[1].role, ChatRole::User);
        assert!(request.messages[1].content.contains("raw transcript"));
    }

    #[tokio::test]
    async fn provider_errors_become_failed_text() {
        let summarizer = Summarizer::new(Some(Box::new(RecordingClient {
            requests: Arc::new(Mutex::new(Vec::new())),
            reply: Err(LlmError::ProviderUnavailable("connection refused".into())),
        })));

        let completion = summarizer.summarize("raw", "outline").await;
        assert!(completion.is_failed());
        assert!(completion.text().starts_with(FAILURE_CONTEXT));
        assert!(completion.text().contains("connection refused"));
    }
}
