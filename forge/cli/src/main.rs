//! Forge CLI
//!
//! Terminal surface for the forge generation pipeline.
//!
//! # Usage
//!
//! ```bash
//! # One request, then exit
//! forge "Build a todo app with React and Express"
//!
//! # Interactive: one request per line, /history to show the transcript, /quit to leave
//! forge
//!
//! # Different backend, nothing written to disk
//! forge --endpoint http://localhost:8080/generate --no-write "Build a CLI in Rust"
//!
//! # With verbose logging
//! RUST_LOG=forge_core=debug forge "Build a blog"
//! ```
//!
//! # Signals
//!
//! - SIGINT (Ctrl-C): cancels the run in progress; when idle, exits

mod display;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use forge_core::{
    controller::event_channel, load_config_from_path, CancellationToken, Collaborators,
    ConfigOverrides, ConversationController, DirectorySink, FileSink, ForgeConfig, HttpBackend,
    JsonTranscriptStore, MemoryTranscriptStore, NullFileSink, RunCanceller, RunOutcome,
    TracingLogSink, TranscriptStore,
};

use crate::display::{print_history, Display};

/// Generate a project, file by file, from a plain-language request
#[derive(Debug, Parser)]
#[command(name = "forge", version, about)]
struct Args {
    /// Project request. Without it, requests are read from stdin.
    prompt: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/forge/forge.toml)
    #[arg(long, env = "FORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Generation endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Model identifier passed to the backend
    #[arg(long)]
    model: Option<String>,

    /// Directory generated files are written under
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Transcript file
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Pause between reveal steps, in milliseconds
    #[arg(long)]
    chunk_delay_ms: Option<u64>,

    /// Show generated files without writing them
    #[arg(long)]
    no_write: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            output_dir: self.output_dir.clone(),
            transcript_path: self.transcript.clone(),
            chunk_delay_ms: self.chunk_delay_ms,
        }
    }
}

fn load(args: &Args) -> anyhow::Result<ForgeConfig> {
    let path = args.config.clone().or_else(forge_core::default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    config.apply_overrides(&args.overrides());
    config.validate().context("Invalid configuration")?;
    info!(source = %config.source(), endpoint = %config.backend.endpoint, "Configuration loaded");
    Ok(config)
}

fn collaborators(config: &ForgeConfig, no_write: bool) -> Collaborators {
    let store: Arc<dyn TranscriptStore> = match &config.transcript.path {
        Some(path) => Arc::new(JsonTranscriptStore::new(path)),
        None => Arc::new(MemoryTranscriptStore::new()),
    };
    let files: Arc<dyn FileSink> = if no_write {
        Arc::new(NullFileSink)
    } else {
        Arc::new(DirectorySink::new(&config.output_dir))
    };

    Collaborators {
        store,
        files,
        log: Arc::new(TracingLogSink),
    }
}

/// Ctrl-C cancels the current run, or asks the interactive loop to stop
fn watch_interrupts(canceller: RunCanceller, shutdown: CancellationToken) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            if canceller.cancel() {
                info!("Cancelling current run");
            } else {
                shutdown.cancel();
                return;
            }
        }
    });
}

async fn interactive(
    controller: &mut ConversationController<HttpBackend>,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Describe a project, /history to show the conversation, /quit to leave.");

    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => print_history(controller.transcript().messages())?,
            text => {
                controller.submit(text).await;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("forge_cli=info".parse()?)
                .add_directive("forge_core=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load(&args)?;

    let backend = Arc::new(
        HttpBackend::from_settings(&config.backend).context("Failed to build HTTP client")?,
    );
    let (tx, rx) = event_channel();
    let printer = tokio::spawn(Display::default().run(rx));

    let mut controller = ConversationController::from_config(
        &config,
        backend,
        collaborators(&config, args.no_write),
        tx,
    )
    .await;

    let shutdown = CancellationToken::new();
    watch_interrupts(controller.cancel_handle(), shutdown.clone());

    let code = match args.prompt.as_deref() {
        Some(prompt) => match controller.auto_start(prompt).await {
            RunOutcome::Completed { .. } => ExitCode::SUCCESS,
            RunOutcome::Cancelled { .. } => ExitCode::from(130),
            RunOutcome::Failed { .. } | RunOutcome::Rejected => ExitCode::FAILURE,
        },
        None => {
            interactive(&mut controller, &shutdown).await?;
            ExitCode::SUCCESS
        }
    };

    // Dropping the controller closes the event channel so the printer drains and exits.
    drop(controller);
    if let Err(e) = printer.await {
        warn!(error = %e, "Display task failed");
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_to_overrides() {
        let args = Args::parse_from([
            "forge",
            "--endpoint",
            "http://example.test/gen",
            "--chunk-delay-ms",
            "0",
            "--no-write",
            "Build a blog",
        ]);

        assert_eq!(args.prompt.as_deref(), Some("Build a blog"));
        assert!(args.no_write);
        let overrides = args.overrides();
        assert_eq!(overrides.endpoint.as_deref(), Some("http://example.test/gen"));
        assert_eq!(overrides.chunk_delay_ms, Some(0));
        assert!(overrides.model.is_none());
    }

    #[test]
    fn test_config_file_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        std::fs::write(&path, "[backend]\nmodel = \"from-file\"\n").unwrap();

        let args = Args::parse_from([
            "forge",
            "--config",
            path.to_str().unwrap(),
            "--output-dir",
            "out",
        ]);
        let config = load(&args).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.config_file_path.as_deref(), Some(path.as_path()));
    }
}
