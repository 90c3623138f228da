//! Chat command grammar.

use regex::Regex;
use std::sync::LazyLock;

/// `figma track <fileId>`. Figma file keys are ASCII alphanumeric.
static TRACK_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"figma track ([A-Za-z0-9]+)").expect("hardcoded track command regex"));

/// Extract the file id from a tracking command, if `body` contains one.
pub fn parse_track_command(body: &str) -> Option<&str> {
    TRACK_COMMAND
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|file_id| file_id.as_str())
}
