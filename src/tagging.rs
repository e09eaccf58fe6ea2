//! # Thematic tagging
//!
//! Asks the generation model to label a chunk with tags from a controlled
//! vocabulary and to explain the choice. The model is told to put the
//! comma-separated tags first and the explanation after, but replies are
//! parsed leniently: the first line that mentions any vocabulary tag is the
//! tag line, and everything after it is the reasoning.

use tracing::{info, warn};

use crate::assembler::Payload;
use crate::error::GenerationError;
use crate::generation::Generator;

/// The built-in controlled vocabulary.
pub const DEFAULT_TAGS: [&str; 12] = [
    "african_values_and_worldviews",
    "critique_of_western_ai_ethics",
    "language_and_translation",
    "infrastructure_and_data_realities",
    "youth_and_futures",
    "personal_reflection",
    "african_ai_startups_and_case_studies",
    "power_dynamics_global_north_south",
    "climate_and_frugal_innovation",
    "speculative_or_poetic_expression",
    "critical_question_or_problem_statement",
    "connective_or_transition_fragment",
];

pub fn default_vocabulary() -> Vec<String> {
    DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
}

/// Tags and reasoning for one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub tags: Vec<String>,
    pub reasoning: String,
}

/// Classifies chunks through a [`Generator`].
pub struct Tagger<'g, G> {
    generator: &'g G,
    vocabulary: Vec<String>,
}

impl<'g, G: Generator> Tagger<'g, G> {
    pub fn new(generator: &'g G, vocabulary: Vec<String>) -> Self {
        Self {
            generator,
            vocabulary,
        }
    }

    /// The classification prompt for `text`.
    pub fn prompt(&self, text: &str) -> Payload {
        let prompt = format!(
            "Classify the following text based on the most relevant tags from this list:\n{}\n\
             Return only a comma-separated list of 1-3 tags first, followed by a short explanation of why you chose them.\n\n\
             Text:\n{}",
            self.vocabulary.join("; "),
            text
        );
        Payload::from(prompt)
    }

    /// Classify `text`.
    ///
    /// # Errors
    /// Propagates every [`GenerationError`]; see [`crate::builder`] for which
    /// ones abort a whole archive build.
    pub async fn classify(&self, text: &str) -> Result<Classification, GenerationError> {
        let reply = self.generator.generate(&self.prompt(text)).await?;
        let classification = parse_classification(&reply, &self.vocabulary);
        if classification.tags.is_empty() {
            warn!("No known tags in reply: {:?}", reply.lines().next());
        } else {
            info!("Tagged: {}", classification.tags.join(", "));
        }
        Ok(classification)
    }
}

/// Split a model reply into tags and reasoning.
pub fn parse_classification(reply: &str, vocabulary: &[String]) -> Classification {
    let lines: Vec<&str> = reply.lines().collect();
    let tag_line = lines
        .iter()
        .position(|line| vocabulary.iter().any(|tag| line.contains(tag.as_str())));

    match tag_line {
        Some(index) => Classification {
            tags: lines[index]
                .split(',')
                .map(|t| t.trim().trim_matches(|c: char| c == '*' || c == '`' || c == '.'))
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            reasoning: lines[index + 1..].join("\n").trim().to_string(),
        },
        None => Classification {
            tags: Vec::new(),
            reasoning: reply.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::CannedGenerator;

    #[test]
    fn test_parse_tag_line_after_preamble() {
        let reply = "Here are the tags:\n\
                     african_values_and_worldviews, personal_reflection\n\
                     The author reflects on ubuntu.\nIt is personal.";
        let c = parse_classification(reply, &default_vocabulary());
        assert_eq!(c.tags, vec!["african_values_and_worldviews", "personal_reflection"]);
        assert_eq!(c.reasoning, "The author reflects on ubuntu.\nIt is personal.");
    }

    #[test]
    fn test_parse_single_tag_without_comma() {
        let c = parse_classification("**youth_and_futures**\nAbout the next generation.", &default_vocabulary());
        assert_eq!(c.tags, vec!["youth_and_futures"]);
    }

    #[test]
    fn test_parse_no_known_tag() {
        let c = parse_classification("I cannot classify this.", &default_vocabulary());
        assert!(c.tags.is_empty());
        assert_eq!(c.reasoning, "I cannot classify this.");
    }

    #[tokio::test]
    async fn test_classify_sends_vocabulary_and_text() {
        let generator = CannedGenerator::ok("language_and_translation\nBecause of Swahili.");
        let tagger = Tagger::new(&generator, default_vocabulary());

        let c = tagger.classify("Swahili has no word for 'algorithm'.").await.unwrap();
        assert_eq!(c.tags, vec!["language_and_translation"]);

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("climate_and_frugal_innovation; speculative_or_poetic_expression"));
        assert!(prompts[0].ends_with("Text:\nSwahili has no word for 'algorithm'."));
    }
}
