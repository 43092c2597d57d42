use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::engine::PortMapping;

/// One distro variant: the image built from its Dockerfile and the
/// container published from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetEntry {
    /// Container name.
    pub name: String,
    /// Image tag.
    pub image: String,
    pub host_port: u16,
    /// Dockerfile, relative to the build context root.
    pub dockerfile: String,
}

impl FleetEntry {
    pub fn new(name: &str, image: &str, host_port: u16, dockerfile: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            host_port,
            dockerfile: dockerfile.to_string(),
        }
    }

    /// Entry for `Dockerfile.<distro>` following the `nginx-*` / `my-app-*` naming.
    fn distro(distro: &str, host_port: u16) -> Self {
        Self::new(
            &format!("nginx-{distro}"),
            &format!("my-app-{distro}"),
            host_port,
            &format!("Dockerfile.{distro}"),
        )
    }

    pub fn dockerfile_path(&self, context_root: &Path) -> PathBuf {
        context_root.join(&self.dockerfile)
    }

    pub fn ports(&self, container_port: u16) -> PortMapping {
        PortMapping {
            host: self.host_port,
            container: container_port,
        }
    }
}

/// The five distro variants, in build/run order.
pub fn default_fleet() -> Vec<FleetEntry> {
    vec![
        FleetEntry::distro("alpine", 8081),
        FleetEntry::distro("ubuntu", 8082),
        FleetEntry::distro("debian", 8083),
        FleetEntry::distro("centos", 8084),
        FleetEntry::distro("amazonlinux", 8085),
    ]
}

/// Reject fleets the engine could never satisfy: empty, or with two entries
/// sharing a container name or host port.
pub fn validate(fleet: &[FleetEntry]) -> Result<()> {
    if fleet.is_empty() {
        bail!("fleet has no entries");
    }

    let mut names = HashSet::new();
    let mut ports = HashSet::new();
    for entry in fleet {
        if entry.name.is_empty() || entry.image.is_empty() || entry.dockerfile.is_empty() {
            bail!("fleet entry {:?} has an empty field", entry.name);
        }
        if !names.insert(entry.name.as_str()) {
            bail!("container name {:?} appears more than once", entry.name);
        }
        if !ports.insert(entry.host_port) {
            bail!(
                "host port {} is used by more than one entry ({})",
                entry.host_port,
                entry.name
            );
        }
    }
    Ok(())
}
