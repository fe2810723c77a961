//! Terminal output for controller events
//!
//! Stage progress, the live reveal and run summaries go to stdout. Logs go to
//! stderr, so the two streams never interleave mid-line.

use std::io::{self, Write};

use tokio::sync::mpsc;

use forge_core::{
    ChatMessage, ForgeEvent, LiveCodingState, MessageKind, RunId, RunOutcome, Sender,
    StageProgress,
};

/// Reveal currently being echoed
struct Reveal {
    run_id: RunId,
    file_name: String,
    printed: usize,
    /// Set by the final update; the next update starts a new artifact
    finished: bool,
}

/// Prints events as they arrive
#[derive(Default)]
pub struct Display {
    current_run: Option<RunId>,
    reveal: Option<Reveal>,
}

impl Display {
    /// Consume events until the controller drops its sender
    pub async fn run(mut self, mut rx: mpsc::Receiver<ForgeEvent>) {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.handle(&event) {
                tracing::warn!(error = %e, "Failed to write to stdout");
            }
        }
    }

    fn handle(&mut self, event: &ForgeEvent) -> io::Result<()> {
        if let Some(run_id) = event.run_id() {
            if self.current_run.is_some_and(|current| run_id < current) {
                tracing::trace!(%run_id, "Ignoring event from a stale run");
                return Ok(());
            }
        }

        let mut out = io::stdout().lock();
        match event {
            ForgeEvent::RunStarted { run_id, .. } => {
                self.current_run = Some(*run_id);
                self.reveal = None;
            }
            ForgeEvent::Stage { progress, .. } => print_stage(&mut out, progress)?,
            ForgeEvent::LiveCoding { run_id, state } => self.print_reveal(&mut out, *run_id, state)?,
            ForgeEvent::ArtifactCommitted { artifact, .. } => {
                writeln!(out, "  saved {}", artifact.file_path)?;
            }
            ForgeEvent::Message { message } => print_message(&mut out, message)?,
            ForgeEvent::RunFinished { outcome, .. } => print_outcome(&mut out, outcome)?,
        }
        out.flush()
    }

    fn print_reveal(
        &mut self,
        out: &mut impl Write,
        run_id: RunId,
        state: &LiveCodingState,
    ) -> io::Result<()> {
        let same_file = self
            .reveal
            .as_ref()
            .is_some_and(|r| {
                !r.finished && r.run_id == run_id && r.file_name == state.file_name
            });
        if !same_file {
            writeln!(
                out,
                "\n── {} ({}, {}) ──",
                state.file_name, state.language, state.complexity
            )?;
            self.reveal = Some(Reveal {
                run_id,
                file_name: state.file_name.clone(),
                printed: 0,
                finished: false,
            });
        }

        if let Some(reveal) = self.reveal.as_mut() {
            if let Some(fresh) = state.content.get(reveal.printed..) {
                write!(out, "{fresh}")?;
                reveal.printed = state.content.len();
            }
            if !state.is_active {
                reveal.finished = true;
                writeln!(out)?;
                if state.progress < 100 {
                    writeln!(out, "  (stopped at {}%)", state.progress)?;
                }
            }
        }
        Ok(())
    }
}

fn print_stage(out: &mut impl Write, progress: &StageProgress) -> io::Result<()> {
    writeln!(
        out,
        "[{:>3}%] {}: {} (~{:.1}s left)",
        progress.progress,
        progress.stage_name,
        progress.description,
        progress.estimated_time_remaining.as_secs_f32()
    )
}

fn print_message(out: &mut impl Write, message: &ChatMessage) -> io::Result<()> {
    if message.sender == Sender::User {
        return Ok(());
    }
    match message.kind {
        MessageKind::Analysis => {
            writeln!(out, "\n{}", message.content)?;
            if let Some(metadata) = &message.metadata {
                writeln!(
                    out,
                    "\n  files: {}  ·  ~{} lines",
                    metadata.files_generated, metadata.estimated_lines
                )?;
                if !metadata.technologies.is_empty() {
                    writeln!(out, "  technologies: {}", metadata.technologies.join(", "))?;
                }
                if !metadata.patterns.is_empty() {
                    writeln!(out, "  patterns: {}", metadata.patterns.join(", "))?;
                }
            }
            Ok(())
        }
        MessageKind::Error => writeln!(out, "\nerror: {}", message.content),
        MessageKind::Normal | MessageKind::System => writeln!(out, "\n{}", message.content),
        // Already shown by the reveal.
        MessageKind::Code => Ok(()),
    }
}

fn print_outcome(out: &mut impl Write, outcome: &RunOutcome) -> io::Result<()> {
    match outcome {
        RunOutcome::Completed { artifacts } => writeln!(out, "\nDone: {artifacts} file(s)."),
        RunOutcome::Cancelled { committed } => {
            writeln!(out, "\nCancelled. {committed} file(s) were kept.")
        }
        RunOutcome::Failed { .. } | RunOutcome::Rejected => Ok(()),
    }
}

/// Print the whole transcript
pub fn print_history(messages: &[ChatMessage]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for message in messages {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Ai => "forge",
        };
        let kind = kind_label(message.kind);
        writeln!(
            out,
            "[{}] {who} ({kind}): {}",
            message.timestamp.format("%H:%M:%S"),
            first_line(&message.content)
        )?;
    }
    out.flush()
}

fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Analysis => "analysis",
        MessageKind::Code => "code",
        MessageKind::Normal => "normal",
        MessageKind::Error => "error",
        MessageKind::System => "system",
    }
}

fn first_line(content: &str) -> String {
    let mut lines = content.lines();
    let first = lines.next().unwrap_or_default();
    if lines.next().is_some() {
        format!("{first} …")
    } else {
        first.to_string()
    }
}
