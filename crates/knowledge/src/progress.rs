//! Structured progress reporting for a generation run.
//!
//! Long-running phases (collection, chunking, embedding, retrieval, stage
//! execution, output) emit events through an optional callback so a
//! presentation layer can show incremental feedback.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collect,
    Chunk,
    Embed,
    Context,
    Stage,
    Write,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Context => "context",
            Self::Stage => "stage",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event emitted during a run.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,

    /// Current progress (files collected, chunks embedded, stages done)
    pub current: u64,

    /// Total expected work (if known)
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    /// Human-readable message
    pub message: String,

    /// Elapsed time since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    /// Create a new progress event.
    pub fn new(phase: Phase, current: u64, total: Option<u64>, message: impl Into<String>) -> Self {
        let percentage =
            total.map(|t| if t > 0 { (current as f64 / t as f64) * 100.0 } else { 0.0 });

        Self {
            phase,
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    /// Set elapsed time.
    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => format!("{}", self.current),
        };

        let pct = match self.percentage {
            Some(p) => format!(" ({:.0}%)", p),
            None => String::new(),
        };

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress reporter that emits events through a callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl ProgressReporter {
    /// Create a new reporter with a callback.
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Create a no-op reporter (no events emitted).
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    /// Emit a progress event.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let event = event.with_elapsed(elapsed);

            tracing::trace!(
                phase = %event.phase,
                current = event.current,
                total = ?event.total,
                message = %event.message,
                elapsed_secs = elapsed,
                "Progress event"
            );

            callback(event);
        }
    }

    pub fn collect(&self, files: u64, skipped: u64) {
        self.emit(ProgressEvent::new(
            Phase::Collect,
            files,
            None,
            format!("{} files collected, {} skipped", files, skipped),
        ));
    }

    pub fn chunk(&self, chunks: u64, files: u64) {
        self.emit(ProgressEvent::new(
            Phase::Chunk,
            chunks,
            None,
            format!("{} chunks from {} files", chunks, files),
        ));
    }

    pub fn embed(&self, current: u64, total: u64, model: &str) {
        self.emit(ProgressEvent::new(
            Phase::Embed,
            current,
            Some(total),
            format!("model={}", model),
        ));
    }

    pub fn context(&self, stage: &str, chunks: u64) {
        self.emit(ProgressEvent::new(
            Phase::Context,
            chunks,
            None,
            format!("{} chunks retrieved for {}", chunks, stage),
        ));
    }

    /// Emit a stage event; `done` is the number of stages already finished.
    pub fn stage(&self, done: u64, total: u64, stage: &str) {
        self.emit(ProgressEvent::new(
            Phase::Stage,
            done,
            Some(total),
            format!("running {}", stage),
        ));
    }

    pub fn write(&self, target: &str) {
        self.emit(ProgressEvent::new(
            Phase::Write,
            1,
            Some(1),
            format!("writing {}", target),
        ));
    }
}
