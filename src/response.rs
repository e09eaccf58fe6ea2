//! Splitting model replies on the follow-up marker.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::assembler::FOLLOW_UP_MARKER;

static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d").expect("valid regex"));

/// A reply split into the answer and the follow-up block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedResponse {
    /// Everything before the marker, trimmed.
    pub main: String,
    /// Everything after the marker, trimmed. `None` when the model omitted the marker.
    pub follow_ups: Option<String>,
}

impl GeneratedResponse {
    /// The numbered lines of the follow-up block.
    pub fn follow_up_questions(&self) -> Vec<String> {
        self.follow_ups
            .as_deref()
            .map(|block| {
                block
                    .lines()
                    .map(str::trim)
                    .filter(|line| NUMBERED_LINE.is_match(line))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Split `raw` on the first [`FOLLOW_UP_MARKER`].
pub fn split_response(raw: &str) -> GeneratedResponse {
    match raw.split_once(FOLLOW_UP_MARKER) {
        Some((main, follow_ups)) => GeneratedResponse {
            main: main.trim().to_string(),
            follow_ups: Some(follow_ups.trim().to_string()),
        },
        None => GeneratedResponse {
            main: raw.trim().to_string(),
            follow_ups: None,
        },
    }
}
