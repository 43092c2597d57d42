#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use anyhow::Result;

use distrofleet::engine::{CommandResult, ContainerEngine, PortMapping};
use distrofleet::fleet::FleetEntry;

/// In-memory engine that keeps container and image state the way docker
/// does, so lifecycle sequences can be checked end to end.
///
/// Every call is logged as `"<verb> <target>"`. A call can be forced to
/// fail with [`FakeEngine::fail`], or all calls with [`FakeEngine::fail_all`].
/// [`FakeEngine::time_out`] makes a call come back as if it hit the timeout.
#[derive(Default)]
pub struct FakeEngine {
    pub calls: Vec<String>,
    pub images: BTreeSet<String>,
    /// container name -> (image, running)
    pub containers: BTreeMap<String, (String, bool)>,
    /// containers ever created, per name
    pub created: HashMap<String, usize>,
    forced: BTreeSet<String>,
    timed_out: BTreeSet<String>,
    fail_all: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, call: &str) -> Self {
        self.forced.insert(call.to_string());
        self
    }

    pub fn time_out(mut self, call: &str) -> Self {
        self.timed_out.insert(call.to_string());
        self
    }

    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn with_image(mut self, image: &str) -> Self {
        self.images.insert(image.to_string());
        self
    }

    pub fn with_container(mut self, name: &str, image: &str, running: bool) -> Self {
        self.containers
            .insert(name.to_string(), (image.to_string(), running));
        self
    }

    pub fn running(&self) -> BTreeSet<String> {
        self.containers
            .iter()
            .filter(|(_, (_, running))| *running)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn calls_starting_with(&self, verb: &str) -> Vec<&str> {
        let prefix = format!("{verb} ");
        self.calls
            .iter()
            .filter(|c| c.starts_with(&prefix) || c.as_str() == verb)
            .map(String::as_str)
            .collect()
    }

    /// Log the call and return the forced answer, if any.
    fn enter(&mut self, call: String, err: &str) -> Option<CommandResult> {
        let answer = if self.timed_out.contains(&call) {
            Some(CommandResult {
                timed_out: true,
                ..CommandResult::default()
            })
        } else if self.fail_all || self.forced.contains(&call) {
            Some(CommandResult::failed(1, err))
        } else {
            None
        };
        self.calls.push(call);
        answer
    }
}

fn respond(ok: bool, err: &str) -> Result<CommandResult> {
    if ok {
        Ok(CommandResult::ok())
    } else {
        Ok(CommandResult::failed(1, err))
    }
}

impl ContainerEngine for FakeEngine {
    fn build_image(
        &mut self,
        dockerfile: &Path,
        context: &Path,
        tag: &str,
    ) -> Result<CommandResult> {
        let call = format!("build {} {} {tag}", dockerfile.display(), context.display());
        if let Some(forced) = self.enter(call, "build failed") {
            return Ok(forced);
        }
        self.images.insert(tag.to_string());
        respond(true, "")
    }

    fn list_images(&mut self) -> Result<CommandResult> {
        if let Some(forced) = self.enter("images".into(), "daemon down") {
            return Ok(forced);
        }
        let mut result = CommandResult::ok();
        result.log = self.images.iter().cloned().collect::<Vec<_>>().join("\n");
        Ok(result)
    }

    fn start_container(&mut self, name: &str) -> Result<CommandResult> {
        if let Some(forced) = self.enter(format!("start {name}"), "forced") {
            return Ok(forced);
        }
        match self.containers.get_mut(name) {
            Some((_, running)) => {
                *running = true;
                respond(true, "")
            }
            None => respond(false, "No such container"),
        }
    }

    fn create_container(
        &mut self,
        name: &str,
        image: &str,
        ports: PortMapping,
    ) -> Result<CommandResult> {
        if let Some(forced) = self.enter(format!("create {name} {image} {ports}"), "forced") {
            return Ok(forced);
        }
        if self.containers.contains_key(name) {
            return respond(false, "Conflict. The container name is already in use");
        }
        if !self.images.contains(image) {
            return respond(false, "Unable to find image");
        }
        self.containers
            .insert(name.to_string(), (image.to_string(), true));
        *self.created.entry(name.to_string()).or_default() += 1;
        respond(true, "")
    }

    fn list_containers(&mut self) -> Result<CommandResult> {
        if let Some(forced) = self.enter("ps".into(), "daemon down") {
            return Ok(forced);
        }
        let mut result = CommandResult::ok();
        result.log = self.running().into_iter().collect::<Vec<_>>().join("\n");
        Ok(result)
    }

    fn stop_container(&mut self, name: &str) -> Result<CommandResult> {
        if let Some(forced) = self.enter(format!("stop {name}"), "forced") {
            return Ok(forced);
        }
        match self.containers.get_mut(name) {
            Some((_, running)) => {
                *running = false;
                respond(true, "")
            }
            None => respond(false, "No such container"),
        }
    }

    fn remove_container(&mut self, name: &str) -> Result<CommandResult> {
        if let Some(forced) = self.enter(format!("rm {name}"), "forced") {
            return Ok(forced);
        }
        match self.containers.get(name) {
            Some((_, true)) => respond(false, "cannot remove a running container"),
            Some((_, false)) => {
                self.containers.remove(name);
                respond(true, "")
            }
            None => respond(false, "No such container"),
        }
    }

    fn remove_image(&mut self, tag: &str) -> Result<CommandResult> {
        if let Some(forced) = self.enter(format!("rmi {tag}"), "forced") {
            return Ok(forced);
        }
        if self.containers.values().any(|(image, _)| image == tag) {
            return respond(false, "image is being used by a container");
        }
        let removed = self.images.remove(tag);
        respond(removed, "No such image")
    }
}

pub fn pair() -> Vec<FleetEntry> {
    vec![
        FleetEntry::new("A", "imgA", 9001, "Dockerfile.a"),
        FleetEntry::new("B", "imgB", 9002, "Dockerfile.b"),
    ]
}
