use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{EngineCommand, PortMapping};

/// Shared invocation settings for every engine command.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub program: String,
    pub timeout: Duration,
    pub workdir: Option<PathBuf>,
}

impl EngineSettings {
    fn command<I, S>(&self, args: I) -> EngineCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EngineCommand {
            program: self.program.clone(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: self.timeout,
            current_dir: self.workdir.clone(),
        }
    }
}

/// `build -f <dockerfile> -t <tag> <context>`
pub fn build_command(
    settings: &EngineSettings,
    dockerfile: &Path,
    context: &Path,
    tag: &str,
) -> EngineCommand {
    settings.command([
        "build".to_string(),
        "-f".into(),
        dockerfile.display().to_string(),
        "-t".into(),
        tag.to_string(),
        context.display().to_string(),
    ])
}

/// Plain `version` exits non-zero when the daemon is unreachable, for docker
/// and podman alike.
pub fn version_command(settings: &EngineSettings) -> EngineCommand {
    settings.command(["version"])
}

pub fn list_images_command(settings: &EngineSettings) -> EngineCommand {
    settings.command(["images"])
}

pub fn start_command(settings: &EngineSettings, name: &str) -> EngineCommand {
    settings.command(["start", name])
}

/// `run -d -p <host>:<container> --name <name> <image>`
pub fn create_command(
    settings: &EngineSettings,
    name: &str,
    image: &str,
    ports: PortMapping,
) -> EngineCommand {
    settings.command([
        "run".to_string(),
        "-d".into(),
        "-p".into(),
        ports.to_string(),
        "--name".into(),
        name.to_string(),
        image.to_string(),
    ])
}

pub fn list_containers_command(settings: &EngineSettings) -> EngineCommand {
    settings.command(["ps"])
}

pub fn stop_command(settings: &EngineSettings, name: &str) -> EngineCommand {
    settings.command(["stop", name])
}

pub fn remove_container_command(settings: &EngineSettings, name: &str) -> EngineCommand {
    settings.command(["rm", name])
}

pub fn remove_image_command(settings: &EngineSettings, tag: &str) -> EngineCommand {
    settings.command(["rmi", tag])
}
