//! Figma comment webhook payload model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a Figma comment webhook delivery. Ephemeral; consumed once.
///
/// Every field defaults so that partial deliveries still deserialize; the
/// router drops payloads missing the fields it needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub file_key: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub comment_id: String,
    /// Comment id this comment replies to; empty for top-level comments.
    #[serde(default)]
    pub parent_id: String,
    /// RFC 3339 creation timestamp, used by the staleness filter.
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub triggered_by: TriggeredBy,
    /// Ordered comment text fragments.
    #[serde(default)]
    pub comment: Vec<CommentFragment>,
    /// Shared webhook secret, compared against the configured passcode.
    #[serde(default)]
    pub passcode: String,
}

/// Author of the comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggeredBy {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub handle: String,
}

/// One fragment of comment text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentFragment {
    #[serde(default)]
    pub text: String,
}

impl CommentPayload {
    /// Missing either field the relay needs to do anything useful.
    pub fn is_malformed(&self) -> bool {
        self.file_name.is_empty() || self.comment_id.is_empty()
    }

    /// Parsed creation timestamp, if `created_at` is valid RFC 3339.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Comment fragments joined with a newline separator.
    pub fn joined_text(&self) -> String {
        self.comment
            .iter()
            .map(|fragment| fragment.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
