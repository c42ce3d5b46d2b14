//! Filesystem-safe names and plain-text rendering of remote markup.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x1f\x7f]").unwrap());
static RESERVED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LINE_BREAK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<.*?>").unwrap());

/// Name used when nothing usable is left after sanitizing.
pub const FALLBACK_NAME: &str = "unknown";

/// Placeholder for an empty or missing description.
pub const NO_DESCRIPTION: &str = "No description";

/// Turn an arbitrary remote title into a single path component.
///
/// Control characters become spaces, path separators and characters reserved
/// on Windows are dropped, whitespace runs collapse, and trailing dots are
/// trimmed. Names that would escape the parent directory map to `unknown`.
pub fn sanitize_filename(name: &str) -> String {
    let name = CONTROL_CHARS.replace_all(name, " ");
    let name = RESERVED_CHARS.replace_all(&name, "");
    let name = WHITESPACE_RUN.replace_all(&name, " ");
    let name = name.trim().trim_end_matches('.').trim_end();

    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Strip HTML tags from a description, keeping explicit line breaks.
pub fn strip_markup(text: Option<&str>) -> String {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return NO_DESCRIPTION.to_string();
    };

    let text = LINE_BREAK_TAG.replace_all(text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let text = text.trim();
    if text.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        text.to_string()
    }
}
