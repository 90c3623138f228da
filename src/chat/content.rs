//! Message and event content values for the Matrix wire format.

use serde::{Deserialize, Serialize};

/// HTML format identifier for formatted bodies.
pub const HTML_FORMAT: &str = "org.matrix.custom.html";

/// Extension field carrying the upstream Figma comment id on every relayed
/// message, so later deliveries can be correlated back to it.
pub const COMMENT_ID_FIELD: &str = "uk.half-shot.matrix-figma.comment_id";

/// An `m.room.message` content body, plain plus optional HTML rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessage {
    pub msgtype: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
    #[serde(rename = "m.relates_to", skip_serializing_if = "Option::is_none")]
    pub relates_to: Option<RelatesTo>,
    #[serde(rename = "uk.half-shot.matrix-figma.comment_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,
}

impl RoomMessage {
    /// Plain-text notice.
    pub fn notice(body: impl Into<String>) -> Self {
        Self {
            msgtype: "m.notice".into(),
            body: body.into(),
            format: None,
            formatted_body: None,
            relates_to: None,
            comment_id: None,
        }
    }

    /// Notice with an HTML rendering alongside the plain body.
    pub fn notice_html(body: impl Into<String>, formatted_body: impl Into<String>) -> Self {
        Self {
            format: Some(HTML_FORMAT.into()),
            formatted_body: Some(formatted_body.into()),
            ..Self::notice(body)
        }
    }

    /// Attach the upstream comment id extension field.
    pub fn with_comment_id(mut self, comment_id: impl Into<String>) -> Self {
        self.comment_id = Some(comment_id.into());
        self
    }

    /// Turn this message into a rich reply to a previously sent event.
    ///
    /// Normalized envelope: the relation is set explicitly instead of being
    /// spread over the content ad hoc.
    pub fn into_reply_to(mut self, event_id: impl Into<String>) -> Self {
        self.relates_to = Some(RelatesTo::reply(event_id));
        self
    }
}

/// The `m.relates_to` relation envelope. Covers both the rich-reply shape
/// (`m.in_reply_to`) and annotation reactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatesTo {
    #[serde(rename = "m.in_reply_to", skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<InReplyTo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl RelatesTo {
    /// Rich-reply relation to `event_id`.
    pub fn reply(event_id: impl Into<String>) -> Self {
        Self {
            in_reply_to: Some(InReplyTo { event_id: event_id.into() }),
            rel_type: None,
            event_id: None,
            key: None,
        }
    }

    /// Annotation relation, used for emoji reactions.
    pub fn annotation(event_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            in_reply_to: None,
            rel_type: Some("m.annotation".into()),
            event_id: Some(event_id.into()),
            key: Some(key.into()),
        }
    }
}

/// Reply target reference inside `m.relates_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InReplyTo {
    pub event_id: String,
}

/// Content of an `m.reaction` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionContent {
    #[serde(rename = "m.relates_to")]
    pub relates_to: RelatesTo,
}

impl ReactionContent {
    pub fn new(event_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self { relates_to: RelatesTo::annotation(event_id, key) }
    }
}
