//! Terminal output for the `companion` binary.
//!
//! Answers print in bold blue, follow-up questions in green, and search hits
//! with a grey score column. Everything writes through any [`Write`] so the
//! layout can be checked in tests.

use crossterm::{
    QueueableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::ranker::RankedChunk;
use crate::response::GeneratedResponse;

fn styled<W: Write>(out: &mut W, color: Color, bold: bool, text: &str) -> io::Result<()> {
    out.queue(SetForegroundColor(color))?;
    if bold {
        out.queue(SetAttribute(Attribute::Bold))?;
    }
    write!(out, "{text}")?;
    out.queue(SetAttribute(Attribute::Reset))?;
    out.queue(SetForegroundColor(Color::Reset))?;
    Ok(())
}

/// Print the main answer followed by any follow-up questions.
pub fn write_response<W: Write>(out: &mut W, response: &GeneratedResponse) -> io::Result<()> {
    styled(out, Color::Blue, true, response.main.trim())?;
    writeln!(out)?;

    let questions = response.follow_up_questions();
    if !questions.is_empty() {
        writeln!(out)?;
        styled(out, Color::Cyan, true, "Follow-up questions")?;
        writeln!(out)?;
        for question in questions {
            styled(out, Color::Green, false, &question)?;
            writeln!(out)?;
        }
    }
    out.flush()
}

/// Print ranked chunks as `#rank [id] score` headers over their text.
pub fn write_ranked<W: Write>(out: &mut W, ranked: &[RankedChunk]) -> io::Result<()> {
    for (rank, chunk) in ranked.iter().enumerate() {
        styled(out, Color::Cyan, true, &format!("#{} [{}]", rank + 1, chunk.record.id))?;
        write!(out, " ")?;
        styled(out, Color::DarkGrey, false, &format!("{:.4}", chunk.score))?;
        if !chunk.record.tags.is_empty() {
            write!(out, "  ({})", chunk.record.tags.join(", "))?;
        }
        writeln!(out)?;
        writeln!(out, "{}", chunk.record.text.trim())?;
        writeln!(out)?;
    }
    out.flush()
}

/// Spinner shown while waiting on the generation service.
pub fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} {elapsed}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
