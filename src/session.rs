//! # Essay session
//!
//! Caller-owned state for building an essay section by section. Each
//! generated section is recorded together with the prompt that produced it,
//! and the follow-up questions are collected alongside so both can be saved
//! at the end:
//!
//! ```text
//! <dir>/<base>.txt            sections, separated by blank lines
//! <dir>/<base>_followups.txt  follow-up questions per section
//! ```

use chrono::Local;
use clap::ValueEnum;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::SessionError;
use crate::response::GeneratedResponse;

/// File format for saved essays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
pub enum SaveFormat {
    #[default]
    Txt,
    Md,
}

impl SaveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Txt => "txt",
            SaveFormat::Md => "md",
        }
    }
}

/// One generated section of the essay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EssaySection {
    pub prompt: String,
    pub body: String,
    /// Numbered follow-up questions, one per line. Empty when the model gave none.
    pub follow_ups: String,
}

impl EssaySection {
    fn render(&self) -> String {
        format!("[Prompt: {}]\n{}", self.prompt, self.body)
    }
}

/// Where the essay and its follow-up questions were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedEssay {
    pub essay: PathBuf,
    pub follow_ups: PathBuf,
}

/// Sections accumulated across interactions.
#[derive(Debug, Default, Clone)]
pub struct EssaySession {
    sections: Vec<EssaySection>,
}

impl EssaySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generated section; returns the rendered section text.
    pub fn add_section(&mut self, prompt: &str, response: &GeneratedResponse) -> String {
        let section = EssaySection {
            prompt: prompt.trim().to_string(),
            body: response.main.clone(),
            follow_ups: response.follow_up_questions().join("\n"),
        };
        let rendered = section.render();
        self.sections.push(section);
        rendered
    }

    /// Drop the most recent section, returning it.
    pub fn undo_last(&mut self) -> Option<EssaySection> {
        self.sections.pop()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }

    pub fn sections(&self) -> &[EssaySection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// All sections, in order, separated by blank lines.
    pub fn essay_text(&self) -> String {
        self.sections
            .iter()
            .map(EssaySection::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Follow-up questions of every section that produced some.
    pub fn follow_ups_text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.follow_ups.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Write `<dir>/<base>.<ext>` and `<dir>/<base>_followups.<ext>`, creating `dir`.
    pub fn save(&self, dir: &Path, base: &str, format: SaveFormat) -> Result<SavedEssay, SessionError> {
        let base = base.trim();
        if base.is_empty() {
            return Err(SessionError::MissingFilename);
        }
        fs::create_dir_all(dir).map_err(|source| SessionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let ext = format.extension();
        let saved = SavedEssay {
            essay: dir.join(format!("{base}.{ext}")),
            follow_ups: dir.join(format!("{base}_followups.{ext}")),
        };

        for (path, contents) in [
            (&saved.essay, self.essay_text()),
            (&saved.follow_ups, self.follow_ups_text()),
        ] {
            fs::write(path, contents).map_err(|source| SessionError::Io {
                path: path.clone(),
                source,
            })?;
        }

        info!(
            "Saved {} sections to {}",
            self.sections.len(),
            saved.essay.display()
        );
        Ok(saved)
    }
}

/// Default filename base, e.g. `essay_20261018_142501`.
pub fn default_essay_name() -> String {
    format!("essay_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::split_response;

    fn session() -> EssaySession {
        let mut session = EssaySession::new();
        session.add_section(
            "Why is decolonial AI important?",
            &split_response("It re-centres whose knowledge counts.\n--- FOLLOW-UP-BEGIN ---\n1. Whose data?\n2. Whose values?"),
        );
        session.add_section("What comes next?", &split_response("Local models."));
        session
    }

    #[test]
    fn test_sections_render_with_prompts() {
        assert_eq!(
            session().essay_text(),
            "[Prompt: Why is decolonial AI important?]\nIt re-centres whose knowledge counts.\n\n\
             [Prompt: What comes next?]\nLocal models."
        );
    }

    #[test]
    fn test_follow_ups_skip_sections_without_questions() {
        assert_eq!(session().follow_ups_text(), "1. Whose data?\n2. Whose values?");
    }

    #[test]
    fn test_undo_and_clear() {
        let mut session = session();
        let last = session.undo_last().unwrap();
        assert_eq!(last.prompt, "What comes next?");
        assert_eq!(session.sections().len(), 1);
        session.clear();
        assert!(session.is_empty());
        assert!(session.undo_last().is_none());
    }

    #[test]
    fn test_save_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("essays");
        let saved = session().save(&target, "draft", SaveFormat::Md).unwrap();

        assert_eq!(saved.essay, target.join("draft.md"));
        assert_eq!(saved.follow_ups, target.join("draft_followups.md"));
        assert!(fs::read_to_string(&saved.essay).unwrap().starts_with("[Prompt: Why"));
        assert_eq!(
            fs::read_to_string(&saved.follow_ups).unwrap(),
            "1. Whose data?\n2. Whose values?"
        );
    }

    #[test]
    fn test_save_requires_filename() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            session().save(dir.path(), "  ", SaveFormat::Txt),
            Err(SessionError::MissingFilename)
        ));
    }
}
