//! Command-line interface for the `companion` binary, built with `clap`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::session::SaveFormat;

/// Parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Config file to use instead of `<config_dir>/config.yaml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// The available subcommands.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write the default config and prompt templates.
    Init,

    /// Answer one question from the archive.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question. If omitted, a default question is used.
        question: Option<String>,

        /// Use the essay-like narrative framing instead of a short answer.
        #[arg(long)]
        narrative: bool,

        /// Chunks to retrieve (overrides `top_k` in the config).
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// Show the archive chunks closest to a query.
    #[clap(name = "search", alias = "s")]
    Search {
        query: String,

        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// Build an essay section by section from prompts read on stdin.
    ///
    /// Type `undo` to drop the last section and `done` to finish and save.
    #[clap(name = "essay", alias = "e")]
    Essay {
        /// Directory the essay is saved to.
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// File name base; defaults to a timestamped name.
        #[arg(long)]
        name: Option<String>,

        #[arg(long, value_enum, default_value_t = SaveFormat::Txt)]
        format: SaveFormat,
    },

    /// Segment, tag, and embed a text file into a new archive.
    #[clap(name = "build", alias = "b")]
    Build {
        input: PathBuf,

        /// Where to write the archive (defaults to `archive_path` from the config).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
