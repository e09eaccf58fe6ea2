//! The `companion` CLI.
//!
//! ```sh
//! companion init
//! companion ask "How do African values shape ethical AI?"
//! companion search "frugal innovation" -k 3
//! companion essay --name ubuntu --format md
//! companion build notes.txt --output chunks.bin
//! ```
//!
//! Logging goes to stderr and is filtered through `RUST_LOG`.

use archive_companion::{
    archive::ChunkStore,
    assembler::{ContextAssembler, Mode},
    builder::build_archive,
    commands::{Cli, Commands},
    config::{CompanionConfig, load_config},
    config_dir, display,
    embedder::SentenceEmbeddingsModel,
    generation::OllamaClient,
    load_embedder,
    pipeline::Companion,
    segment::DEFAULT_MAX_SENTENCES,
    session::{EssaySession, SaveFormat, default_essay_name},
    tagging::Tagger,
    template::{PromptTemplate, Templates},
};
use clap::Parser;
use once_cell::sync::OnceCell;
use std::{
    error::Error,
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

const DEFAULT_QUESTION: &str = "What does my archive say about African values and ethical AI?";

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

/// Loaded configuration plus the directory relative paths resolve against.
struct Context {
    config: CompanionConfig,
    base: PathBuf,
}

impl Context {
    fn load(config_path: &Path) -> Result<Self, Box<dyn Error>> {
        let base = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let config = if config_path.is_file() {
            load_config(config_path)?
        } else {
            warn!(
                "No config at {}; using defaults (run `companion init`)",
                config_path.display()
            );
            CompanionConfig::default()
        };
        debug!("Config loaded: {:?}", config);
        Ok(Self { config, base })
    }

    fn generator(&self) -> Result<OllamaClient, Box<dyn Error>> {
        Ok(OllamaClient::new(
            &self.config.generation_url,
            &self.config.model,
            Duration::from_secs(self.config.request_timeout_secs),
        )?)
    }

    async fn embedder(&self) -> Result<Arc<SentenceEmbeddingsModel>, Box<dyn Error>> {
        let config = self.config.clone();
        let base = self.base.clone();
        let model = tokio::task::spawn_blocking(move || load_embedder(&config, &base)).await??;
        Ok(Arc::new(model))
    }

    async fn companion(
        &self,
        top_k: Option<usize>,
    ) -> Result<Companion<SentenceEmbeddingsModel, OllamaClient>, Box<dyn Error>> {
        let store = ChunkStore::load(self.config.resolve_archive_path(&self.base))?;
        let templates = Templates::load_or_default(&self.base.join("templates"))?;
        let embedder = self.embedder().await?;
        Ok(Companion::new(Arc::new(store), embedder, self.generator()?)
            .with_top_k(top_k.unwrap_or(self.config.top_k))
            .with_assembler(ContextAssembler::new(templates)))
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => config_dir()?.join("config.yaml"),
    };
    if let Commands::Init = cli.command {
        return init(&config_path);
    }

    let ctx = Context::load(&config_path)?;
    match cli.command {
        // handled above; init must not require an existing config
        Commands::Init => {}
        Commands::Ask {
            question,
            narrative,
            top_k,
        } => {
            let question = question.unwrap_or_else(|| DEFAULT_QUESTION.to_string());
            let mode = if narrative {
                Mode::Narrative
            } else {
                Mode::ConversationalQa
            };
            let companion = ctx.companion(top_k).await?;

            let spinner = display::spinner("thinking");
            let answer = companion.respond(&question, mode).await;
            spinner.finish_and_clear();

            display::write_response(&mut io::stdout(), &answer?.response)?;
        }
        Commands::Search { query, top_k } => {
            let companion = ctx.companion(top_k).await?;
            let ranked = companion.retrieve(&query).await?;
            display::write_ranked(&mut io::stdout(), &ranked)?;
        }
        Commands::Essay { out, name, format } => {
            let companion = ctx.companion(None).await?;
            essay(&companion, &out, name, format).await?;
        }
        Commands::Build { input, output } => {
            let text = fs::read_to_string(&input)?;
            let generator = ctx.generator()?;
            let tagger = Tagger::new(&generator, ctx.config.tag_vocabulary.clone());
            let embedder = ctx.embedder().await?;

            let store = build_archive(&text, DEFAULT_MAX_SENTENCES, &tagger, embedder).await?;
            let output = output.unwrap_or_else(|| ctx.config.resolve_archive_path(&ctx.base));
            store.save(&output)?;
            println!("Wrote {} chunks to {}", store.len(), output.display());
        }
    }

    Ok(())
}

/// Read prompts from stdin until `done` or EOF, generating one section each.
async fn essay(
    companion: &Companion<SentenceEmbeddingsModel, OllamaClient>,
    out: &Path,
    name: Option<String>,
    format: SaveFormat,
) -> Result<(), Box<dyn Error>> {
    let mut session = EssaySession::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("Enter a prompt per section. `undo` drops the last section, `done` saves.");
    loop {
        print!("\n> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "" => {}
            "done" => break,
            "undo" => match session.undo_last() {
                Some(section) => println!("Removed section: {}", section.prompt),
                None => println!("Nothing to undo."),
            },
            "clear" => {
                session.clear();
                println!("Essay cleared.");
            }
            prompt => {
                let spinner = display::spinner("writing");
                let answer = companion.respond(prompt, Mode::Narrative).await;
                spinner.finish_and_clear();

                match answer {
                    Ok(answer) => {
                        session.add_section(prompt, &answer.response);
                        display::write_response(&mut stdout, &answer.response)?;
                    }
                    // keep the session alive across service hiccups
                    Err(e) => eprintln!("error: {e}"),
                }
            }
        }
    }

    if session.is_empty() {
        println!("No sections written; nothing saved.");
        return Ok(());
    }
    let base = name.unwrap_or_else(default_essay_name);
    let saved = session.save(out, &base, format)?;
    println!(
        "Saved essay to {} and follow-ups to {}",
        saved.essay.display(),
        saved.follow_ups.display()
    );
    Ok(())
}

/// Write the default config and both prompt templates next to `config_path`.
fn init(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let templates_dir = base.join("templates");
    info!("Creating template directory: {}", templates_dir.display());
    fs::create_dir_all(&templates_dir)?;

    for (name, template) in [
        ("narrative", PromptTemplate::narrative()),
        ("conversational", PromptTemplate::conversational()),
    ] {
        let path = templates_dir.join(format!("{name}.yaml"));
        info!("Creating template file: {}", path.display());
        fs::write(path, serde_yaml::to_string(&template)?)?;
    }

    info!("Creating config file: {}", config_path.display());
    fs::write(config_path, serde_yaml::to_string(&CompanionConfig::default())?)?;
    println!("Initialized {}", base.display());
    Ok(())
}
