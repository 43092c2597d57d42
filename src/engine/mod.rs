// Container engine access: process supervision, argument building, the CLI driver.

mod backend;
mod cli;
pub mod commands;
pub mod run;
pub mod types;

pub use backend::ContainerEngine;
pub use cli::CliEngine;
pub use commands::EngineSettings;
pub use types::{CancelToken, CommandResult, EngineCommand, OutputLine, PortMapping};
