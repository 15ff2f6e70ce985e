//! Shared text and time helpers.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use unicode_segmentation::UnicodeSegmentation;

/// Discord's hard limit on message content length.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Formats a timestamp for display in the given timezone.
pub fn format_timestamp(timestamp: DateTime<Utc>, tz: Tz) -> String {
    timestamp
        .with_timezone(&tz)
        .format("%Y-%m-%d %H:%M %Z")
        .to_string()
}

/// Parses a `YYYY-MM-DD HH:MM` wall-clock time in `tz` into UTC.
///
/// Returns `None` for malformed input and for local times that do not exist
/// (DST gaps). Ambiguous local times resolve to the earlier instant.
pub fn parse_local_datetime(input: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M").ok()?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// Truncates a string to at most `max_length` grapheme clusters, ending with
/// an ellipsis when shortened.
pub fn truncate_string(input: &str, max_length: usize) -> String {
    let graphemes: Vec<&str> = input.graphemes(true).collect();
    if graphemes.len() <= max_length {
        return input.to_string();
    }
    let keep = max_length.saturating_sub(1);
    let mut out: String = graphemes[..keep].concat();
    out.push('…');
    out
}

/// Escapes Discord markdown so user text renders literally.
pub fn escape_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '_' | '~' | '`' | '|' | '>' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Collapses newlines so a value fits on a single list line.
pub fn single_line(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
