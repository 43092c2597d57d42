use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::engine::CommandResult;

use super::registry::FleetEntry;

/// The batch the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Build,
    Run,
    Stop,
    Cleanup,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Build => "build",
            Action::Run => "run",
            Action::Stop => "stop",
            Action::Cleanup => "cleanup",
        }
    }
}

/// A single per-entry engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Build,
    Start,
    Create,
    Stop,
    RemoveContainer,
    RemoveImage,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Build => "build",
            Operation::Start => "start",
            Operation::Create => "create",
            Operation::Stop => "stop",
            Operation::RemoveContainer => "remove-container",
            Operation::RemoveImage => "remove-image",
        }
    }

    /// Teardown operations whose failure usually means the target is
    /// already gone. Their failures are tolerated rather than counted.
    pub fn is_best_effort(&self) -> bool {
        matches!(
            self,
            Operation::Stop | Operation::RemoveContainer | Operation::RemoveImage
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Ok,
    /// The engine ran and exited non-zero.
    Failed { exit_code: Option<i32>, log: String },
    /// The engine could not be launched.
    Error { message: String },
    TimedOut,
    /// Interrupted while running.
    Cancelled,
    /// Never attempted because the batch was cancelled.
    Skipped,
}

impl Outcome {
    pub fn from_result(result: &Result<CommandResult>) -> Self {
        match result {
            Ok(r) if r.cancelled => Outcome::Cancelled,
            Ok(r) if r.timed_out => Outcome::TimedOut,
            Ok(r) if r.success => Outcome::Ok,
            Ok(r) => Outcome::Failed {
                exit_code: r.exit_code,
                log: r.log.clone(),
            },
            Err(e) => Outcome::Error {
                message: format!("{e:#}"),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    /// Cancelled or skipped, i.e. the step's result says nothing about the engine.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Outcome::Cancelled | Outcome::Skipped)
    }

    pub fn label(&self) -> String {
        match self {
            Outcome::Ok => "ok".into(),
            Outcome::Failed {
                exit_code: Some(code),
                ..
            } => format!("failed (exit {code})"),
            Outcome::Failed { .. } => "failed".into(),
            Outcome::Error { message } => format!("error: {message}"),
            Outcome::TimedOut => "timed out".into(),
            Outcome::Cancelled => "cancelled".into(),
            Outcome::Skipped => "skipped".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub container: String,
    pub image: String,
    pub operation: Operation,
    pub outcome: Outcome,
}

impl StepRecord {
    pub fn new(entry: &FleetEntry, operation: Operation, outcome: Outcome) -> Self {
        Self {
            container: entry.name.clone(),
            image: entry.image.clone(),
            operation,
            outcome,
        }
    }

    pub fn tally(&self) -> Tally {
        if self.outcome.is_ok() {
            Tally::Succeeded
        } else if self.outcome.is_interrupted() {
            Tally::Skipped
        } else if self.operation == Operation::Start {
            Tally::Fallback
        } else if self.operation.is_best_effort() {
            Tally::Tolerated
        } else {
            Tally::Failed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Succeeded,
    Failed,
    Tolerated,
    /// A failed `start`; the runner goes on to create the container.
    Fallback,
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub tolerated: usize,
    pub fallbacks: usize,
    pub skipped: usize,
}

/// Everything a batch did, in the order it did it.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub action: Action,
    pub context_root: PathBuf,
    pub steps: Vec<StepRecord>,
    /// Output of the closing `images`/`ps` call, when it succeeded.
    pub listing: Option<String>,
    pub summary: Summary,
}

impl BatchReport {
    pub fn new(action: Action, context_root: PathBuf) -> Self {
        Self {
            action,
            context_root,
            steps: Vec::new(),
            listing: None,
            summary: Summary::default(),
        }
    }

    pub fn push(&mut self, record: StepRecord) {
        self.summary.total += 1;
        match record.tally() {
            Tally::Succeeded => self.summary.succeeded += 1,
            Tally::Failed => self.summary.failed += 1,
            Tally::Tolerated => self.summary.tolerated += 1,
            Tally::Fallback => self.summary.fallbacks += 1,
            Tally::Skipped => self.summary.skipped += 1,
        }
        self.steps.push(record);
    }

    /// No entry failed and the batch ran to the end.
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0 && self.summary.skipped == 0
    }

    pub fn steps_for(&self, operation: Operation) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(move |s| s.operation == operation)
    }
}
