//! Small text helpers for item bodies and timestamps.

use chrono::{DateTime, Local, Utc};
use html2text::render::text_renderer::TrivialDecorator;

pub const DEFAULT_MAX_BODY_CHARS: usize = 280;

const ELLIPSIS: &str = "&nbsp;\u{2026}";

/// Wrap width handed to html2text; lines are joined again afterwards.
const RENDER_WIDTH: usize = 2000;

/// Strips markup, decodes entities and collapses whitespace. Script, style
/// and head contents are dropped.
pub fn plain_text(html: &str) -> String {
    let rendered = match html2text::config::with_decorator(TrivialDecorator::new())
        .string_from_read(html.as_bytes(), RENDER_WIDTH)
    {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Could not render item body as text: {}", e);
            return String::new();
        }
    };

    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shortens `s` to at most `max_chars` characters, cutting at the last word
/// boundary and appending a non-breaking ellipsis.
///
/// Trailing `.`, `,` or `:` before the cut is dropped. Returns an empty string
/// when there is no word boundary to cut at.
pub fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.trim_matches(' ');
    let chars: Vec<char> = s.chars().collect();

    if chars.len() <= max_chars {
        return s.to_string();
    }

    let window = &chars[..=max_chars];
    let idx = match window.iter().rposition(|&c| c == ' ') {
        Some(idx) if idx > 0 => idx,
        _ => return String::new(),
    };

    let end = match window[idx - 1] {
        '.' | ',' | ':' => idx - 1,
        _ => idx,
    };

    let mut out: String = window[..end].iter().collect();
    out.push_str(ELLIPSIS);
    out
}

/// Item body for the river: plain text, truncated.
pub fn body(html: &str, max_chars: usize) -> String {
    truncate(&plain_text(html), max_chars)
}

/// RFC 1123 timestamp in GMT, e.g. `Mon, 01 Jan 2024 00:00:00 GMT`.
pub fn format_gmt(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn format_local(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local)
        .format("%a, %d %b %Y %H:%M:%S %Z")
        .to_string()
}
