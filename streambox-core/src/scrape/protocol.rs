//! Worker wire protocol.
//!
//! A worker writes one JSON object per stdout line:
//!
//! ```text
//! {"event": "stream", "data": { ... }}
//! {"event": "finished"}
//! ```
//!
//! Anything else is a protocol violation.

use serde::Deserialize;
use streambox_model::ScrapeEvent;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WorkerMessage {
    Stream {
        #[serde(default)]
        data: serde_json::Value,
    },
    Finished,
}

/// Classify one raw worker line. Blank lines decode to `None`.
pub fn decode_line(line: &str) -> Option<ScrapeEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let event = match serde_json::from_str::<WorkerMessage>(trimmed) {
        Ok(WorkerMessage::Stream { data }) => ScrapeEvent::StreamFound(data),
        Ok(WorkerMessage::Finished) => ScrapeEvent::Finished,
        Err(_) => ScrapeEvent::UnknownEvent(trimmed.to_string()),
    };

    Some(event)
}
