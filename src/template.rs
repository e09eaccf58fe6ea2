//! # Prompt templates
//!
//! The instructional wording wrapped around retrieved context. Each
//! [`Mode`](crate::assembler::Mode) has one [`PromptTemplate`]; the built-in
//! defaults can be overridden by YAML files in the configuration directory:
//!
//! ```text
//! <config_dir>/templates/narrative.yaml
//! <config_dir>/templates/conversational.yaml
//! ```
//!
//! ## YAML example
//!
//! ```yaml
//! intro: "You are a reflective, critical narrator responding to the following question:"
//! guidance: "Offer a thoughtful, grounded response based on the ideas below."
//! follow_up_lead: "At the end, write exactly:"
//! follow_up_request: "Then provide 2-3 numbered follow-up questions."
//! closing: "Your response:"
//! ```
//!
//! The follow-up marker itself is never part of a template: the assembler emits
//! it between `follow_up_lead` and `follow_up_request`, and [`PromptTemplate::validate`]
//! rejects templates that try to include it.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::assembler::{FOLLOW_UP_MARKER, Mode};
use crate::error::TemplateError;

/// Wording for one assembly mode.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PromptTemplate {
    /// Opening line; the quoted query follows it.
    pub intro: String,
    /// How the model should use the context.
    pub guidance: String,
    /// Sentence placed directly before the follow-up marker.
    pub follow_up_lead: String,
    /// Instruction placed directly after the marker.
    pub follow_up_request: String,
    /// Last line of the payload.
    pub closing: String,
}

impl PromptTemplate {
    /// Essay framing used by the essay builder.
    pub fn narrative() -> Self {
        Self {
            intro: "You are a reflective, critical narrator responding to the following user query:".into(),
            guidance: "Use the following annotated excerpts from an archive of African-centered writing to inform your response. \
Each excerpt includes a thematic tag and a short interpretive note (reasoning). Use but do not restate the tags in your response. \
Use the excerpts to paraphrase, synthesise, reflect, or argue, but do not refer to them as 'excerpts'. \
Integrate the ideas into your own voice. Prioritise clarity and contextual sensitivity. Respond in a thoughtful, essay-like tone.\n\n\
Speak with confidence and treat insights as established facts, not possibilities.".into(),
            follow_up_lead: "After your response, include the following marker exactly as written:".into(),
            follow_up_request: "Then provide 2-3 follow-up questions for deeper reflection, one per line and numbered.".into(),
            closing: "Your response:".into(),
        }
    }

    /// Shorter conversational framing for one-off questions.
    pub fn conversational() -> Self {
        Self {
            intro: "You are a reflective, critical narrator responding to the following question:".into(),
            guidance: "Offer a thoughtful, grounded response based on the ideas below. Speak in your own voice and do not mention where these ideas came from. \
Integrate key themes, insights, and connections, but do not reference any 'excerpts', 'texts', or sources.\n\n\
Respond in a warm, intelligent tone. Use 1-2 short paragraphs.".into(),
            follow_up_lead: "At the end, write exactly:".into(),
            follow_up_request: "Then provide 2-3 follow-up questions for deeper thought, one per line and numbered.".into(),
            closing: "Your response:".into(),
        }
    }

    /// Reject templates that would break the follow-up protocol.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let fields: [(&'static str, &str); 5] = [
            ("intro", &self.intro),
            ("guidance", &self.guidance),
            ("follow_up_lead", &self.follow_up_lead),
            ("follow_up_request", &self.follow_up_request),
            ("closing", &self.closing),
        ];
        for (name, value) in fields {
            if value.contains(FOLLOW_UP_MARKER) {
                return Err(TemplateError::ContainsMarker(name));
            }
        }
        Ok(())
    }
}

/// One template per [`Mode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Templates {
    pub narrative: PromptTemplate,
    pub conversational: PromptTemplate,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            narrative: PromptTemplate::narrative(),
            conversational: PromptTemplate::conversational(),
        }
    }
}

impl Templates {
    pub fn for_mode(&self, mode: Mode) -> &PromptTemplate {
        match mode {
            Mode::Narrative => &self.narrative,
            Mode::ConversationalQa => &self.conversational,
        }
    }

    /// Load `<dir>/<mode>.yaml` for each mode, falling back to the built-in
    /// template when a file is absent.
    pub fn load_or_default(dir: &Path) -> Result<Self, TemplateError> {
        let mut templates = Self::default();
        for mode in [Mode::Narrative, Mode::ConversationalQa] {
            let path = dir.join(format!("{}.yaml", mode.template_name()));
            if path.is_file() {
                let template = load_template(&path)?;
                match mode {
                    Mode::Narrative => templates.narrative = template,
                    Mode::ConversationalQa => templates.conversational = template,
                }
            }
        }
        Ok(templates)
    }
}

/// Read and validate a single template file.
///
/// ### Errors
/// Returns an error if the file cannot be read, is not a valid template, or
/// contains the follow-up marker.
pub fn load_template(path: &Path) -> Result<PromptTemplate, TemplateError> {
    tracing::info!("Loading template: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let template: PromptTemplate = serde_yaml::from_str(&content)?;
    template.validate()?;
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_templates_are_valid() {
        assert!(PromptTemplate::narrative().validate().is_ok());
        assert!(PromptTemplate::conversational().validate().is_ok());
    }

    #[test]
    fn test_load_template_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
intro: "Answer this:"
guidance: "Be brief."
follow_up_lead: "Then write:"
follow_up_request: "List two questions."
closing: "Go:"
"#
        )
        .unwrap();

        let template = load_template(file.path()).unwrap();
        assert_eq!(template.intro, "Answer this:");
        assert_eq!(template.closing, "Go:");
    }

    #[test]
    fn test_load_template_invalid_file() {
        assert!(load_template(Path::new("non/existent/path.yaml")).is_err());
    }

    #[test]
    fn test_load_template_invalid_format() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"invalid: template: format"#).unwrap();
        assert!(matches!(load_template(file.path()), Err(TemplateError::Parse(_))));
    }

    #[test]
    fn test_template_with_marker_rejected() {
        let mut template = PromptTemplate::conversational();
        template.follow_up_lead = format!("Write {FOLLOW_UP_MARKER} now");
        assert!(matches!(
            template.validate(),
            Err(TemplateError::ContainsMarker("follow_up_lead"))
        ));
    }

    #[test]
    fn test_load_or_default_overrides_one_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut custom = PromptTemplate::conversational();
        custom.closing = "Reply:".into();
        fs::write(
            dir.path().join("conversational.yaml"),
            serde_yaml::to_string(&custom).unwrap(),
        )
        .unwrap();

        let templates = Templates::load_or_default(dir.path()).unwrap();
        assert_eq!(templates.conversational.closing, "Reply:");
        assert_eq!(templates.narrative, PromptTemplate::narrative());
    }
}
