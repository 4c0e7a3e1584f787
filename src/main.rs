use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use ideation_canvas::canvas::error::BackendError;
use ideation_canvas::canvas::generate::{GeneratedImage, GenerationRequest};
use ideation_canvas::canvas::ingest::SourceFile;
use ideation_canvas::canvas::messages::GenerationEvent;
use ideation_canvas::canvas::save::write_png;
use ideation_canvas::canvas::{GenerationBackend, HttpBackend, IdeationSession};
use ideation_canvas::{logging, settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Headless ideation canvas: compose a bordered design from a photo and
/// reference images, and optionally send it to a generation service.
#[derive(Parser, Debug)]
#[command(name = "ideation-canvas", version)]
struct Cli {
    /// Settings file. Defaults to settings.json next to the executable.
    #[arg(long, value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG is honoured).
    #[arg(short, long, global = true)]
    debug: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flatten a photo and its references into one PNG. No network access.
    Compose {
        /// Base photo.
        #[arg(short, long)]
        base: PathBuf,
        /// Reference images, laid out in order.
        #[arg(short, long, num_args = 0..)]
        refs: Vec<PathBuf>,
        /// Output file. Defaults to a timestamped file in the export folder.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compose, submit with a prompt and write the cropped result.
    Generate {
        #[arg(short, long)]
        base: PathBuf,
        #[arg(short, long, num_args = 0..)]
        refs: Vec<PathBuf>,
        #[arg(short, long)]
        prompt: String,
        /// Overrides the endpoint from settings.
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Backend for commands that never submit.
struct Offline;

impl GenerationBackend for Offline {
    fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
        Err(BackendError::Transport("offline".into()))
    }
}

fn load_session_inputs(session: &mut IdeationSession, base: &Path, refs: &[PathBuf]) -> Result<()> {
    let photo = SourceFile::from_path(base)?;
    session
        .import_photo(photo)
        .with_context(|| format!("import {}", base.display()))?;
    let files = refs
        .iter()
        .map(|path| SourceFile::from_path(path))
        .collect::<Result<Vec<_>>>()?;
    let requested = files.len();
    let added = session.add_references(files);
    if added < requested {
        tracing::warn!(requested, added, "some reference files were not images");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = settings::load(cli.settings.as_deref())?;
    logging::init(cli.debug || settings.debug_logging, cli.log_file.clone());

    match cli.command {
        Command::Compose { base, refs, output } => {
            let mut session = IdeationSession::new(settings.session_config(), Arc::new(Offline));
            load_session_inputs(&mut session, &base, &refs)?;
            let path = match output {
                Some(path) => {
                    let flat = session.flatten().context("no photo loaded")?;
                    write_png(&path, &flat)?;
                    path
                }
                None => session.export_design(Local::now())?,
            };
            println!("{}", path.display());
        }
        Command::Generate {
            base,
            refs,
            prompt,
            endpoint,
            output,
        } => {
            let endpoint = endpoint.unwrap_or_else(|| settings.endpoint.clone());
            let backend = HttpBackend::new(&endpoint, settings.request_timeout())?;
            let mut session = IdeationSession::new(settings.session_config(), Arc::new(backend));
            load_session_inputs(&mut session, &base, &refs)?;
            session.set_prompt(prompt);
            session.submit_generation()?;

            let event = loop {
                if let Some(event) = session.wait_for_generation(Duration::from_secs(1)) {
                    break event;
                }
                if !session.is_generating() {
                    bail!("generation was abandoned");
                }
                tracing::info!(elapsed_s = session.elapsed().as_secs_f32(), "waiting for generation");
            };

            match event {
                GenerationEvent::Applied { .. } => {
                    let path = match output {
                        Some(path) => {
                            let active = session.versions().active().context("no active version")?;
                            write_png(&path, active.image.pixels())?;
                            path
                        }
                        None => session.export_version(0, Local::now())?,
                    };
                    println!("{}", path.display());
                }
                GenerationEvent::Failed { error, .. } => bail!("generation failed: {error}"),
            }
        }
    }
    Ok(())
}
