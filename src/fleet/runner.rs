use std::path::PathBuf;

use anyhow::Result;

use crate::config::RunPolicy;
use crate::engine::{CancelToken, CommandResult, ContainerEngine};

use super::registry::FleetEntry;
use super::report::{Action, BatchReport, Operation, Outcome, StepRecord};

const DEFAULT_CONTAINER_PORT: u16 = 80;

/// Drives best-effort batches over a fleet, one engine call at a time.
///
/// Every entry is attempted in registry order; a failing entry is recorded
/// and the batch moves on. Only cancellation stops a batch early, in which
/// case the remaining steps are recorded as [`Outcome::Skipped`].
pub struct FleetRunner<E> {
    engine: E,
    fleet: Vec<FleetEntry>,
    context_root: PathBuf,
    container_port: u16,
    policy: RunPolicy,
    cancel: CancelToken,
}

impl<E: ContainerEngine> FleetRunner<E> {
    pub fn new(engine: E, fleet: Vec<FleetEntry>, context_root: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            fleet,
            context_root: context_root.into(),
            container_port: DEFAULT_CONTAINER_PORT,
            policy: RunPolicy::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_container_port(mut self, port: u16) -> Self {
        self.container_port = port;
        self
    }

    pub fn with_run_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Build every image from its Dockerfile, then list images.
    pub fn build_all(&mut self) -> BatchReport {
        let mut report = BatchReport::new(Action::Build, self.context_root.clone());
        tracing::info!(root = %self.context_root.display(), "building {} images", self.fleet.len());

        for entry in &self.fleet {
            let dockerfile = entry.dockerfile_path(&self.context_root);
            attempt(&self.cancel, &mut report, entry, Operation::Build, || {
                self.engine
                    .build_image(&dockerfile, &self.context_root, &entry.image)
            });
        }

        if !self.cancel.is_cancelled() {
            report.listing = listing(self.engine.list_images(), "images");
        }
        report
    }

    /// Resume or create every container, then list running containers.
    ///
    /// Under [`RunPolicy::StartOrCreate`] a container is only created when
    /// `start` fails, so repeated runs never produce duplicates.
    pub fn run_or_start_all(&mut self) -> BatchReport {
        let mut report = BatchReport::new(Action::Run, self.context_root.clone());
        tracing::info!(
            policy = self.policy.as_str(),
            "running {} containers",
            self.fleet.len()
        );

        for entry in &self.fleet {
            let ports = entry.ports(self.container_port);

            if self.policy == RunPolicy::StartOrCreate {
                if self.cancel.is_cancelled() {
                    report.push(StepRecord::new(entry, Operation::Start, Outcome::Skipped));
                    continue;
                }
                let outcome = Outcome::from_result(&self.engine.start_container(&entry.name));
                if outcome.is_ok() || outcome.is_interrupted() {
                    log_outcome(entry, Operation::Start, &outcome);
                    report.push(StepRecord::new(entry, Operation::Start, outcome));
                    continue;
                }
                tracing::debug!(
                    container = %entry.name,
                    "start {}, creating a new container",
                    outcome.label()
                );
                report.push(StepRecord::new(entry, Operation::Start, outcome));
            }

            attempt(&self.cancel, &mut report, entry, Operation::Create, || {
                self.engine.create_container(&entry.name, &entry.image, ports)
            });
        }

        if !self.cancel.is_cancelled() {
            report.listing = listing(self.engine.list_containers(), "ps");
        }
        report
    }

    /// Stop every container. Absent or already stopped containers are tolerated.
    pub fn stop_all(&mut self) -> BatchReport {
        let mut report = BatchReport::new(Action::Stop, self.context_root.clone());
        tracing::info!("stopping {} containers", self.fleet.len());

        for entry in &self.fleet {
            attempt(&self.cancel, &mut report, entry, Operation::Stop, || {
                self.engine.stop_container(&entry.name)
            });
        }
        report
    }

    /// Stop all containers, then remove all containers, then remove all images.
    ///
    /// Each phase covers the whole fleet before the next one starts.
    pub fn cleanup_all(&mut self) -> BatchReport {
        let mut report = BatchReport::new(Action::Cleanup, self.context_root.clone());
        tracing::info!("cleaning up {} containers and images", self.fleet.len());

        for entry in &self.fleet {
            attempt(&self.cancel, &mut report, entry, Operation::Stop, || {
                self.engine.stop_container(&entry.name)
            });
        }
        for entry in &self.fleet {
            attempt(&self.cancel, &mut report, entry, Operation::RemoveContainer, || {
                self.engine.remove_container(&entry.name)
            });
        }
        for entry in &self.fleet {
            attempt(&self.cancel, &mut report, entry, Operation::RemoveImage, || {
                self.engine.remove_image(&entry.image)
            });
        }
        report
    }
}

/// Run one step unless the batch is cancelled, log it and record it.
fn attempt(
    cancel: &CancelToken,
    report: &mut BatchReport,
    entry: &FleetEntry,
    operation: Operation,
    call: impl FnOnce() -> Result<CommandResult>,
) {
    let outcome = if cancel.is_cancelled() {
        Outcome::Skipped
    } else {
        Outcome::from_result(&call())
    };
    log_outcome(entry, operation, &outcome);
    report.push(StepRecord::new(entry, operation, outcome));
}

fn log_outcome(entry: &FleetEntry, operation: Operation, outcome: &Outcome) {
    match outcome {
        Outcome::Ok => {
            tracing::info!(
                container = %entry.name,
                image = %entry.image,
                "{} ok",
                operation.as_str()
            )
        }
        Outcome::Skipped => {
            tracing::debug!(container = %entry.name, "{} skipped", operation.as_str())
        }
        _ if operation.is_best_effort() => tracing::warn!(
            container = %entry.name,
            image = %entry.image,
            "{} {}, continuing",
            operation.as_str(),
            outcome.label()
        ),
        _ => tracing::warn!(
            container = %entry.name,
            image = %entry.image,
            "{} {}",
            operation.as_str(),
            outcome.label()
        ),
    }
}

/// Keep the closing listing's output; its failure is only logged.
fn listing(result: Result<CommandResult>, what: &str) -> Option<String> {
    match result {
        Ok(r) if r.success => Some(r.log),
        Ok(r) => {
            tracing::warn!("{what} listing failed (exit {:?})", r.exit_code);
            None
        }
        Err(e) => {
            tracing::warn!("{what} listing failed: {e:#}");
            None
        }
    }
}
