use std::path::Path;

use anyhow::Result;

use super::types::{CommandResult, PortMapping};

/// The narrow set of engine capabilities the fleet runner relies on.
///
/// `Err` means the engine could not be reached at all (binary missing,
/// spawn failure). A reachable engine that refuses the request returns
/// `Ok` with `success == false`.
pub trait ContainerEngine {
    fn build_image(&mut self, dockerfile: &Path, context: &Path, tag: &str)
    -> Result<CommandResult>;

    fn list_images(&mut self) -> Result<CommandResult>;

    fn start_container(&mut self, name: &str) -> Result<CommandResult>;

    /// Create and start a detached container.
    fn create_container(
        &mut self,
        name: &str,
        image: &str,
        ports: PortMapping,
    ) -> Result<CommandResult>;

    /// Running containers only.
    fn list_containers(&mut self) -> Result<CommandResult>;

    fn stop_container(&mut self, name: &str) -> Result<CommandResult>;

    fn remove_container(&mut self, name: &str) -> Result<CommandResult>;

    fn remove_image(&mut self, tag: &str) -> Result<CommandResult>;
}
