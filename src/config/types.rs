use std::path::PathBuf;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::fleet::{self, FleetEntry};

/// What `run` does for each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPolicy {
    /// Resume an existing container, create it only if `start` fails.
    #[default]
    StartOrCreate,
    /// Always create a fresh container. Fails for names that already exist.
    AlwaysCreate,
}

impl RunPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPolicy::StartOrCreate => "start-or-create",
            RunPolicy::AlwaysCreate => "always-create",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine binary, any docker-compatible CLI.
    pub engine: String,
    /// Per-invocation timeout in seconds.
    pub timeout: u64,
    /// Build context root. Falls back to the working directory.
    pub context_root: Option<PathBuf>,
    /// Port the images listen on inside the container.
    pub container_port: u16,
    pub run_policy: RunPolicy,
    pub fleet: Vec<FleetEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            timeout: 600,
            context_root: None,
            container_port: 80,
            run_policy: RunPolicy::StartOrCreate,
            fleet: fleet::default_fleet(),
        }
    }
}

/// Values given on the command line. `Some` wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub engine: Option<String>,
    pub timeout: Option<u64>,
    pub context_root: Option<PathBuf>,
    pub run_policy: Option<RunPolicy>,
}

impl Config {
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(engine) = overrides.engine {
            self.engine = engine;
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        if let Some(root) = overrides.context_root {
            self.context_root = Some(root);
        }
        if let Some(policy) = overrides.run_policy {
            self.run_policy = policy;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.trim().is_empty() {
            bail!("engine must name a container CLI");
        }
        if self.timeout == 0 {
            bail!("timeout must be a positive number of seconds");
        }
        if self.container_port == 0 {
            bail!("container_port must be a positive port number");
        }
        fleet::validate(&self.fleet)
    }
}
