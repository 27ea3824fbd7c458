//! Recipient-targeted emails built from every document of a project.

use serde::{Deserialize, Serialize};

use crate::llm::{ChatClient, ChatMessage, ChatRequest, Completion};
use crate::store::DocumentRecord;

const MAX_OUTPUT_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.7;

/// Label closing every demo-mode email.
pub const DEMO_LABEL: &str =
    "[Demo mode - set OPENAI_API_KEY in the .env file to generate real emails]";

const FAILURE_CONTEXT: &str = "An error occurred while generating the email";

/// Who the email is for and in what setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailContext {
    /// Label of the meeting series the documents came from.
    pub meeting_subject: String,
    /// Organization the recipient belongs to.
    pub organization: String,
    /// What the organization does in this project.
    pub organization_role: String,
    /// Recipient's name.
    pub recipient_name: String,
    /// Recipient's role; a preset name from [`ROLE_PRESETS`] expands to its description.
    pub recipient_role: String,
}

/// Built-in recipient roles and the perspective each one writes from.
pub const ROLE_PRESETS: [(&str, &str); 4] = [
    (
        "Marketer",
        "a marketer focused on market fit, target customers and marketing strategy",
    ),
    (
        "Designer",
        "a designer focused on UI/UX, design requirements and user experience",
    ),
    (
        "Engineer",
        "an engineer focused on technical implementation, architecture and the development plan",
    ),
    (
        "Project Manager",
        "a project manager focused on schedule, resources and risk management",
    ),
];

/// Description of a preset role, matched case-insensitively.
pub fn role_preset(name: &str) -> Option<&'static str> {
    ROLE_PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
        .map(|(_, description)| *description)
}

impl EmailContext {
    /// Recipient role with presets expanded.
    pub fn recipient_role_description(&self) -> &str {
        role_preset(&self.recipient_role).unwrap_or(self.recipient_role.as_str())
    }
}

/// Writes emails from the accumulated documents of a project.
pub struct EmailComposer {
    client: Option<Box<dyn ChatClient>>,
}

impl EmailComposer {
    /// `None` selects demo mode.
    pub fn new(client: Option<Box<dyn ChatClient>>) -> Self {
        Self { client }
    }

    /// Compose an email for `project_name`. Never fails; see [`Completion`].
    pub async fn compose(
        &self,
        project_name: &str,
        context: &EmailContext,
        documents: &[DocumentRecord],
    ) -> Completion {
        let Some(client) = &self.client else {
            tracing::debug!(
                project = project_name,
                "No language model credential; returning demo email"
            );
            return Completion::Demo(demo_email(project_name, context, documents.len()));
        };

        let combined = combine_contents(documents);
        tracing::debug!(
            project = project_name,
            documents = documents.len(),
            combined_chars = combined.chars().count(),
            "Composing email"
        );
        let request = ChatRequest {
            messages: build_messages(project_name, context, &combined),
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };
        Completion::from_provider(client.complete(request).await, FAILURE_CONTEXT)
    }
}

/// Every document's `content`, in the given order, separated by blank lines.
pub fn combine_contents(documents: &[DocumentRecord]) -> String {
    documents
        .iter()
        .map(|document| document.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_messages(project_name: &str, context: &EmailContext, combined: &str) -> Vec<ChatMessage> {
    let EmailContext {
        meeting_subject,
        organization,
        organization_role,
        recipient_name,
        ..
    } = context;
    let recipient_role = context.recipient_role_description();

    vec![
        ChatMessage::system(format!(
            "You are {recipient_name}, working at {organization} as {recipient_role}. \
             {organization}'s role in this project: {organization_role}. \
             Write the email from your own perspective, in a polite and professional tone, \
             with a subject line and a body."
        )),
        ChatMessage::user(format!(
            "Project: {project_name}\nMeeting subject: {meeting_subject}\n\n\
             Project information:\n{combined}\n\n\
             Based on the information above, write the email from your perspective."
        )),
    ]
}

/// Canned talking points for a preset role, used when no model is configured.
struct DemoBrief {
    role: &'static str,
    focus: &'static str,
    sections: [(&'static str, [&'static str; 3]); 2],
    team: &'static str,
}

const DEMO_BRIEFS: [DemoBrief; 4] = [
    DemoBrief {
        role: "Marketer",
        focus: "Marketing strategy and go-to-market plan",
        sections: [
            (
                "Market opportunity",
                [
                    "Target market analysis completed",
                    "Differentiators against competitors identified",
                    "Customer personas defined",
                ],
            ),
            (
                "Marketing strategy",
                [
                    "Digital marketing channels",
                    "Content marketing plan",
                    "Branding and positioning",
                ],
            ),
        ],
        team: "Marketing team",
    },
    DemoBrief {
        role: "Designer",
        focus: "UI/UX requirements and design direction",
        sections: [
            (
                "User experience",
                [
                    "User journey mapping",
                    "Interaction design guide",
                    "Accessibility considerations",
                ],
            ),
            (
                "Design system",
                [
                    "UI component library",
                    "Brand guidelines",
                    "Responsive layout strategy",
                ],
            ),
        ],
        team: "Design team",
    },
    DemoBrief {
        role: "Engineer",
        focus: "Technical architecture and development plan",
        sections: [
            (
                "Technology stack",
                [
                    "Frontend: React or Vue.js",
                    "Backend: Node.js or Python",
                    "Database: PostgreSQL or MongoDB",
                ],
            ),
            (
                "Development plan",
                [
                    "Microservice architecture",
                    "CI/CD pipeline",
                    "Cloud deployment strategy",
                ],
            ),
        ],
        team: "Engineering team",
    },
    DemoBrief {
        role: "Project Manager",
        focus: "Project plan and schedule",
        sections: [
            (
                "Schedule",
                [
                    "Planning: 2 weeks",
                    "Development: 8 weeks",
                    "Testing and release: 2 weeks",
                ],
            ),
            (
                "Resources",
                [
                    "Team structure and responsibilities",
                    "Budget planning",
                    "Risk identification and response",
                ],
            ),
        ],
        team: "Project management team",
    },
];

fn demo_brief(role: &str) -> Option<&'static DemoBrief> {
    DEMO_BRIEFS
        .iter()
        .find(|brief| brief.role.eq_ignore_ascii_case(role.trim()))
}

fn demo_email(project_name: &str, context: &EmailContext, document_count: usize) -> String {
    let EmailContext {
        meeting_subject,
        organization,
        organization_role,
        recipient_name,
        ..
    } = context;
    let recipient_role = context.recipient_role_description();

    let (focus, talking_points, signature) = match demo_brief(&context.recipient_role) {
        Some(brief) => {
            let points = brief
                .sections
                .iter()
                .map(|(heading, items)| {
                    let bullets = items.map(|item| format!("- {item}")).join("\n");
                    format!("{heading}:\n{bullets}")
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            (
                brief.focus.to_string(),
                points,
                format!("{}, {organization}", brief.team),
            )
        }
        None => (
            format!("briefing for {recipient_name}"),
            format!(
                "From your perspective as {recipient_role}:
- Key decisions from the meetings will appear here
- Items that need your attention will appear here
- Suggested next steps will appear here"
            ),
            organization.clone(),
        ),
    };

    format!(
        "Subject: [{project_name}] {meeting_subject} - {focus}

Hello {recipient_name},

This note summarizes the \"{meeting_subject}\" meetings recorded under the {project_name} project \
for {organization} ({organization_role}).

{talking_points}

Source documents: {document_count}

{DEMO_LABEL}

Best regards,
{signature}"
    )
}
