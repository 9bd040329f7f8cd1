//! Transcript rendering.
//!
//! Each text message becomes a brace-delimited block with the body and a
//! locale-style timestamp. Messages sent by the account owner are shifted
//! right by [`SELF_INDENT`] on every line of their block. The output only
//! looks like structured data; bodies are inserted verbatim.

use chat_session::Message;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::{Display, Write};

/// Prefix applied to every line of a self-sent message block.
pub const SELF_INDENT: &str = "\t\t\t";

/// Render using the viewer's local time zone.
pub fn render_transcript(messages: &[Message]) -> String {
    render_transcript_in(messages, &Local)
}

pub fn render_transcript_in<Tz>(messages: &[Message], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    for message in messages.iter().filter(|m| m.kind.is_text()) {
        let indent = if message.from_me { SELF_INDENT } else { "" };
        let time = format_timestamp(message.timestamp, tz);
        // Writing to a String cannot fail
        let _ = write!(
            out,
            "{indent}{{\n{indent}\t\"message\": \"{}\"\n{indent}\t\"time\": \"{}\"\n{indent}}}\n\n",
            message.body, time
        );
    }
    out
}

/// `M/D/YYYY, h:mm:ss AM` for a Unix timestamp in seconds.
pub fn format_timestamp<Tz>(timestamp: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match DateTime::from_timestamp(timestamp, 0) {
        Some(utc) => utc
            .with_timezone(tz)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string(),
        None => "Invalid Date".to_string(),
    }
}
