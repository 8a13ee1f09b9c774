//! Event record extraction from event pages.
//!
//! Event pages embed the record as a JavaScript object literal:
//!
//! ```text
//! const event = {
//!     id: 4521,
//!     title: 'Spring Hike',
//!     allDay: 'False' === 'False',
//!     url: window.location.href,
//!     ...
//! };
//! ```
//!
//! The literal is cut out of the script, the few expressions the site puts in
//! it are rewritten to plain values, and the result is read as JSON5.

use std::sync::LazyLock;

use ecp_ical_core::RawEvent;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::error::{ScrapeError, ScrapeResult};

/// Text that opens the embedded record.
pub const EVENT_MARKER: &str = "const event = {";

/// Text that closes the embedded record.
pub const EVENT_TERMINATOR: &str = "};";

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("static selector is valid"));

static BODY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.boxBodyContentOuterContainer").expect("static selector is valid")
});

/// Extracts the event record from an event page.
///
/// Returns `Ok(None)` when no script carries the record. The page body text,
/// when present, becomes the description.
///
/// # Errors
///
/// Returns an extraction error when the literal is unterminated, does not
/// parse, or is not a usable event record.
pub fn extract_event(html: &[u8], href: &str) -> ScrapeResult<Option<RawEvent>> {
    let document = Html::parse_document(&String::from_utf8_lossy(html));

    let Some(script) = document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.contains(EVENT_MARKER))
    else {
        debug!(url = %href, "No event record on page");
        return Ok(None);
    };

    let literal = event_literal(&script).map_err(|e| e.with_url(href))?;
    let rewritten = rewrite_literal(literal, href);

    let mut record: Value = json5::from_str(&rewritten).map_err(|e| {
        ScrapeError::extraction("event literal does not parse")
            .with_url(href)
            .with_source(e)
    })?;
    let Some(fields) = record.as_object_mut() else {
        return Err(ScrapeError::extraction("event literal is not an object").with_url(href));
    };

    if let Some(body) = document.select(&BODY).next() {
        let description = body.text().collect::<String>();
        fields.insert(
            "description".to_string(),
            Value::String(description.trim().to_string()),
        );
    }

    serde_json::from_value(record).map(Some).map_err(|e| {
        ScrapeError::extraction("event record is incomplete")
            .with_url(href)
            .with_source(e)
    })
}

/// Cuts the object literal out of a script: from the opening brace of the
/// marker through the closing brace of the first terminator after it.
pub fn event_literal(script: &str) -> ScrapeResult<&str> {
    let marker = script
        .find(EVENT_MARKER)
        .ok_or_else(|| ScrapeError::extraction("event marker not found"))?;
    let open = marker + EVENT_MARKER.len() - 1;
    let close = script[open..]
        .find(EVENT_TERMINATOR)
        .ok_or_else(|| ScrapeError::extraction("unterminated event literal"))?;
    Ok(&script[open..=open + close])
}

/// Replaces the script expressions found in event literals with values.
///
/// Substitutions are applied exactly and in order.
pub fn rewrite_literal(literal: &str, href: &str) -> String {
    literal
        .replace("window.location.href", &format!("\"{href}\""))
        .replace(r".replace(/\r+/g, '')", "")
        .replace("'False' === 'False'", "true")
        .replace("'True' === 'False'", "false")
}
