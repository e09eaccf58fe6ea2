//! # Context assembler
//!
//! Renders a query and its ranked chunks into the single prompt string sent to
//! the generation service.
//!
//! ## Payload contract
//! - The query appears verbatim exactly once, quoted under the template intro.
//! - [`FOLLOW_UP_MARKER`] appears exactly once, directly before the instruction
//!   that asks for follow-up questions. [`crate::response::split_response`]
//!   splits replies on the same constant.
//! - Every chunk appears exactly once, in ranked order, untruncated. Each one
//!   renders as:
//!
//! ```text
//! <text>
//! (Tag: tag_a, tag_b)
//! <reasoning>
//! ```
//!
//! Chunks are separated by a blank line. With no chunks the context block is
//! simply empty and the payload is still well formed.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::ranker::RankedChunk;
use crate::template::Templates;

/// Separates the main answer from the follow-up questions in a model reply.
pub const FOLLOW_UP_MARKER: &str = "--- FOLLOW-UP-BEGIN ---";

/// Bumped whenever [`FOLLOW_UP_MARKER`] or its placement changes.
pub const FOLLOW_UP_PROTOCOL_VERSION: u32 = 1;

const TAG_SEPARATOR: &str = ", ";

/// Which framing wraps the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Essay-like, reflective long form.
    Narrative,
    /// Short conversational answer.
    #[default]
    ConversationalQa,
}

impl Mode {
    /// File stem of this mode's template under `templates/`.
    pub fn template_name(self) -> &'static str {
        match self {
            Mode::Narrative => "narrative",
            Mode::ConversationalQa => "conversational",
        }
    }
}

/// The assembled prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Payload {
    fn from(prompt: String) -> Self {
        Payload(prompt)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds payloads from a fixed set of [`Templates`].
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    templates: Templates,
}

impl ContextAssembler {
    pub fn new(templates: Templates) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Render `query` and `ranked` under `mode`'s template.
    pub fn assemble(&self, query: &str, ranked: &[RankedChunk], mode: Mode) -> Payload {
        let template = self.templates.for_mode(mode);
        let context = format_context(ranked);

        let sections = [
            format!("{}\n\"{}\"", template.intro, query),
            template.guidance.clone(),
            format!("{}\n{}", template.follow_up_lead, FOLLOW_UP_MARKER),
            template.follow_up_request.clone(),
            context,
            template.closing.clone(),
        ];

        let payload = sections
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        debug!(
            "Assembled {:?} payload: {} chunks, {} bytes",
            mode,
            ranked.len(),
            payload.len()
        );
        Payload(payload)
    }
}

/// Render chunks in ranked order, separated by blank lines.
pub fn format_context(ranked: &[RankedChunk]) -> String {
    ranked
        .iter()
        .map(|chunk| {
            if chunk.record.text.contains(FOLLOW_UP_MARKER) {
                warn!(
                    "Chunk {} contains the follow-up marker; reply splitting may be ambiguous",
                    chunk.record.id
                );
            }
            format_chunk(chunk)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_chunk(chunk: &RankedChunk) -> String {
    let record = &chunk.record;
    let tags = if record.tags.is_empty() {
        "untagged".to_string()
    } else {
        record.tags.join(TAG_SEPARATOR)
    };

    let mut rendered = format!("{}\n(Tag: {})", record.text.trim(), tags);
    let reasoning = record.reasoning.trim();
    if !reasoning.is_empty() {
        rendered.push('\n');
        rendered.push_str(reasoning);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ChunkRecord;

    fn ranked(id: u64, text: &str, tags: &[&str], reasoning: &str, score: f32) -> RankedChunk {
        RankedChunk {
            record: ChunkRecord::new(
                id,
                text,
                tags.iter().map(|t| t.to_string()).collect(),
                reasoning,
                vec![1.0],
            ),
            score,
        }
    }

    fn fixtures() -> Vec<RankedChunk> {
        vec![
            ranked(
                4,
                "Ubuntu reframes intelligence as relational.",
                &["african_values_and_worldviews", "critique_of_western_ai_ethics"],
                "Centers communal personhood.",
                0.91,
            ),
            ranked(1, "Most training data never crosses the Sahara.", &[], "", 0.80),
            ranked(
                9,
                "Youth will inherit the models we build now.",
                &["youth_and_futures"],
                "  Forward-looking.  ",
                0.42,
            ),
        ]
    }

    #[test]
    fn test_payload_contains_query_once_and_chunks_in_order() {
        let query = "How do African values shape ethical AI?";
        let chunks = fixtures();
        for mode in [Mode::Narrative, Mode::ConversationalQa] {
            let payload = ContextAssembler::default().assemble(query, &chunks, mode);
            let text = payload.as_str();

            assert_eq!(text.matches(query).count(), 1);

            let positions: Vec<usize> = chunks
                .iter()
                .map(|c| {
                    assert_eq!(text.matches(c.record.text.as_str()).count(), 1);
                    text.find(c.record.text.as_str()).unwrap()
                })
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_marker_appears_once_before_follow_up_request() {
        let assembler = ContextAssembler::default();
        let payload = assembler.assemble("What is frugal innovation?", &fixtures(), Mode::ConversationalQa);
        let text = payload.as_str();

        assert_eq!(text.matches(FOLLOW_UP_MARKER).count(), 1);
        assert!(fixtures().iter().all(|c| !c.record.text.contains(FOLLOW_UP_MARKER)));

        let marker_at = text.find(FOLLOW_UP_MARKER).unwrap();
        let request = &assembler.templates().conversational.follow_up_request;
        let request_at = text.find(request.as_str()).unwrap();
        assert_eq!(
            text[marker_at + FOLLOW_UP_MARKER.len()..request_at].trim(),
            ""
        );
    }

    #[test]
    fn test_chunk_rendering() {
        let context = format_context(&fixtures());
        assert_eq!(
            context,
            "Ubuntu reframes intelligence as relational.\n\
             (Tag: african_values_and_worldviews, critique_of_western_ai_ethics)\n\
             Centers communal personhood.\n\n\
             Most training data never crosses the Sahara.\n\
             (Tag: untagged)\n\n\
             Youth will inherit the models we build now.\n\
             (Tag: youth_and_futures)\n\
             Forward-looking."
        );
    }

    #[test]
    fn test_empty_context_still_produces_payload() {
        let payload = ContextAssembler::default().assemble("Why decolonial AI?", &[], Mode::Narrative);
        let text = payload.as_str();
        assert!(text.contains("\"Why decolonial AI?\""));
        assert_eq!(text.matches(FOLLOW_UP_MARKER).count(), 1);
        assert!(text.ends_with("Your response:"));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_modes_use_different_framing() {
        let assembler = ContextAssembler::default();
        let narrative = assembler.assemble("q", &[], Mode::Narrative);
        let qa = assembler.assemble("q", &[], Mode::ConversationalQa);
        assert_ne!(narrative, qa);
        assert!(narrative.as_str().contains("essay-like"));
        assert!(qa.as_str().contains("1-2 short paragraphs"));
    }
}
