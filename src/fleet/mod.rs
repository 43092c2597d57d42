// The fleet registry and the batch lifecycle operations over it.

mod registry;
mod report;
mod runner;

pub use registry::{FleetEntry, default_fleet, validate};
pub use report::{Action, BatchReport, Operation, Outcome, StepRecord, Summary, Tally};
pub use runner::FleetRunner;
