use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{error::CoreError, message::Message};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemReportDescription {
    pub code: String,
    pub en: String,
}

/// A `notification/1.0/problem-report` message, built from a [`CoreError`].
///
/// Mirrors the `problem_reporter` decorator of the original implementation:
/// rather than wrapping every handler in a try/except that converts errors to
/// reports, handlers return a `CoreResult<Option<Message>>` and the dispatcher
/// performs this conversion once, at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemReport {
    #[serde(rename = "@type")]
    pub type_: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub description: ProblemReportDescription,
}

impl ProblemReport {
    pub fn from_error(err: &CoreError) -> Self {
        Self {
            type_: Message::qualify("notification", "1.0", "problem-report"),
            id: uuid::Uuid::new_v4().to_string(),
            description: ProblemReportDescription {
                code: err.code().to_string(),
                en: err.to_string(),
            },
        }
    }

    pub fn into_message(self) -> Message {
        Message::new(self.type_.clone(), json!({ "description": self.description }))
    }
}
