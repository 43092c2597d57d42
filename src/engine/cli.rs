use std::io::Write;
use std::path::Path;

use anyhow::{Result, bail};

use super::backend::ContainerEngine;
use super::commands::{self, EngineSettings};
use super::run;
use super::types::{CancelToken, CommandResult, EngineCommand, PortMapping};

/// [`ContainerEngine`] that shells out to a docker-compatible CLI.
pub struct CliEngine {
    settings: EngineSettings,
    cancel: CancelToken,
    echo: bool,
}

impl CliEngine {
    pub fn new(settings: EngineSettings, cancel: CancelToken) -> Self {
        Self {
            settings,
            cancel,
            echo: true,
        }
    }

    /// Forward engine output to the terminal as it arrives. On by default.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Check that the engine answers `version`, bounded by the configured
    /// timeout and the shared cancel token.
    pub fn ensure_available(&self) -> Result<()> {
        let cmd = commands::version_command(&self.settings);
        tracing::debug!("> {}", cmd.display());

        let result = run::execute(cmd, &self.cancel, |_| {})?;
        let program = &self.settings.program;
        if result.timed_out {
            bail!(
                "{program} did not answer within {}s",
                self.settings.timeout.as_secs_f32()
            );
        }
        if result.cancelled {
            bail!("{program} availability check was cancelled");
        }
        if !result.success {
            let detail = result.log.lines().last().unwrap_or_default();
            bail!("{program} daemon is not reachable (exit {:?}) {detail}", result.exit_code);
        }
        Ok(())
    }

    fn invoke(&self, cmd: EngineCommand) -> Result<CommandResult> {
        tracing::info!("> {}", cmd.display());

        let echo = self.echo;
        let mut stdout = std::io::stdout();
        run::execute(cmd, &self.cancel, |line| {
            if echo {
                let _ = writeln!(stdout, "{line}");
            }
        })
    }
}

impl ContainerEngine for CliEngine {
    fn build_image(
        &mut self,
        dockerfile: &Path,
        context: &Path,
        tag: &str,
    ) -> Result<CommandResult> {
        self.invoke(commands::build_command(&self.settings, dockerfile, context, tag))
    }

    fn list_images(&mut self) -> Result<CommandResult> {
        self.invoke(commands::list_images_command(&self.settings))
    }

    fn start_container(&mut self, name: &str) -> Result<CommandResult> {
        self.invoke(commands::start_command(&self.settings, name))
    }

    fn create_container(
        &mut self,
        name: &str,
        image: &str,
        ports: PortMapping,
    ) -> Result<CommandResult> {
        self.invoke(commands::create_command(&self.settings, name, image, ports))
    }

    fn list_containers(&mut self) -> Result<CommandResult> {
        self.invoke(commands::list_containers_command(&self.settings))
    }

    fn stop_container(&mut self, name: &str) -> Result<CommandResult> {
        self.invoke(commands::stop_command(&self.settings, name))
    }

    fn remove_container(&mut self, name: &str) -> Result<CommandResult> {
        self.invoke(commands::remove_container_command(&self.settings, name))
    }

    fn remove_image(&mut self, tag: &str) -> Result<CommandResult> {
        self.invoke(commands::remove_image_command(&self.settings, tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cli_engine(program: &str) -> CliEngine {
        let settings = EngineSettings {
            program: program.into(),
            timeout: Duration::from_secs(10),
            workdir: None,
        };
        CliEngine::new(settings, CancelToken::new()).with_echo(false)
    }

    #[test]
    fn ensure_available_does_not_panic() {
        // CI may or may not have Docker.
        let _ = cli_engine("docker").ensure_available();
    }

    #[test]
    fn ensure_available_fails_for_missing_program() {
        assert!(cli_engine("distrofleet-no-such-engine").ensure_available().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn ensure_available_gives_up_on_a_hung_engine() {
        // `sh version` runs ./version, which never answers.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("version"), "sleep 5\n").unwrap();
        let settings = EngineSettings {
            program: "sh".into(),
            timeout: Duration::from_millis(300),
            workdir: Some(dir.path().to_path_buf()),
        };
        let engine = CliEngine::new(settings, CancelToken::new()).with_echo(false);

        let started = std::time::Instant::now();
        let err = engine.ensure_available().unwrap_err();

        assert!(err.to_string().contains("did not answer"), "{err:#}");
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    }

    #[cfg(unix)]
    #[test]
    fn ensure_available_reports_refusing_engine() {
        let err = cli_engine("false").ensure_available().unwrap_err();
        assert!(err.to_string().contains("not reachable"), "{err:#}");
    }

    #[test]
    fn missing_engine_is_a_launch_error() {
        let mut engine = cli_engine("distrofleet-no-such-engine");
        let err = engine.stop_container("nginx-alpine").unwrap_err();
        assert!(err.to_string().contains("distrofleet-no-such-engine"));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_passed_through() {
        // `false` ignores its arguments and exits 1, like an engine refusing a request.
        let mut engine = cli_engine("false");
        let result = engine.remove_image("my-app-alpine").unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(1));

        let mut engine = cli_engine("true");
        assert!(engine.start_container("nginx-alpine").unwrap().success);
    }
}
