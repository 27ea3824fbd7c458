//! Built-in Markdown outlines that steer summarization.

use serde::Serialize;

/// A named outline in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Template {
    /// Stable lookup key.
    pub name: &'static str,
    /// Human-readable title.
    pub title: &'static str,
    /// Markdown outline handed to the model.
    pub outline: &'static str,
}

/// Name of the outline used when a caller does not pick one.
pub const DEFAULT_TEMPLATE: &str = "business_plan";

const BUSINESS_PLAN: &str = "\
Organize the content using the following structure:

## 1. Project overview
## 2. Key features
## 3. Technology stack
## 4. Expected schedule
## 5. Risk factors
## 6. Success metrics";

const DECISION_ANALYSIS: &str = "\
Organize the content as a decision analysis:

## 1. Decision to be made
## 2. Background and constraints
## 3. Options considered
   - For each option: benefits, costs, risks
## 4. Evaluation criteria
## 5. Recommendation and rationale
## 6. Open questions and next steps";

const EXECUTIVE_REPORT: &str = "\
Organize the content as an executive report:

## Summary (three sentences at most)
## Current status
## Key results and numbers
## Issues requiring attention
## Decisions requested
## Outlook";

const MEETING_MINUTES: &str = "\
Organize the content as meeting minutes:

## Meeting information
   - Date, participants, purpose
## Agenda
## Discussion
   - One bullet per topic with the main points raised
## Decisions
## Action items
   - Owner, task, due date
## Next meeting";

const CATALOG: [Template; 4] = [
    Template {
        name: "business_plan",
        title: "Business plan",
        outline: BUSINESS_PLAN,
    },
    Template {
        name: "decision_analysis",
        title: "Decision analysis",
        outline: DECISION_ANALYSIS,
    },
    Template {
        name: "executive_report",
        title: "Executive report",
        outline: EXECUTIVE_REPORT,
    },
    Template {
        name: "meeting_minutes",
        title: "Meeting minutes",
        outline: MEETING_MINUTES,
    },
];

/// Every catalog entry, in display order.
pub fn entries() -> &'static [Template] {
    &CATALOG
}

/// Catalog keys, in display order.
pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|template| template.name)
}

/// Look up an entry by name.
pub fn get(name: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|template| template.name == name)
}
