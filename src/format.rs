//! Comment formatting: webhook payload in, message content out. Pure.

use crate::chat::content::RoomMessage;
use crate::payload::CommentPayload;
use crate::room::SentComment;

use pulldown_cmark::{html, Parser};

const FILE_URL_BASE: &str = "https://www.figma.com/file";

/// Zero-width joiner, inserted into handles to defeat client-side
/// @-mention matching on the literal name.
const MENTION_BREAKER: char = '\u{200D}';

/// Build the message content for a comment payload.
///
/// Top-level comments carry the file/permalink preamble; comments whose
/// parent resolved to an already-relayed message are rendered as a rich
/// reply to it and drop the preamble.
pub fn format_comment(payload: &CommentPayload, parent: Option<&SentComment>) -> RoomMessage {
    let handle = decorate_handle(&payload.triggered_by.handle);
    let text = payload.joined_text();

    let message = match parent {
        Some(parent) => {
            let body = format!("**{handle}**: {text}");
            let formatted = render_inline(&body);
            RoomMessage::notice_html(body, formatted).into_reply_to(parent.event_id.as_str())
        }
        None => {
            let permalink = format!("{FILE_URL_BASE}/{}#{}", payload.file_key, payload.comment_id);
            let file_url = format!("{FILE_URL_BASE}/{}", payload.file_key);
            let body = format!(
                "**{handle}** [commented]({permalink}) on [{}]({file_url}) : {text}",
                payload.file_name
            );
            let formatted = render_inline(&body);
            RoomMessage::notice_html(body, formatted)
        }
    };

    message.with_comment_id(payload.comment_id.as_str())
}

/// Insert a zero-width joiner after the first character of each name
/// segment so chat clients don't treat the relayed handle as a mention.
pub fn decorate_handle(handle: &str) -> String {
    handle
        .split(' ')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => format!("{first}{MENTION_BREAKER}{}", chars.as_str()),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render markdown to HTML, unwrapping the outer paragraph for inline use.
fn render_inline(text: &str) -> String {
    let mut rendered = String::new();
    html::push_html(&mut rendered, Parser::new(text));
    let rendered = rendered.trim();
    rendered
        .strip_prefix("<p>")
        .and_then(|inner| inner.strip_suffix("</p>"))
        .unwrap_or(rendered)
        .to_string()
}
