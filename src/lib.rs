//! Lifecycle management for a fixed fleet of per-distro containers.
//!
//! [`fleet::FleetRunner`] walks an ordered registry of [`fleet::FleetEntry`]
//! values and drives a [`engine::ContainerEngine`] through build, run, stop
//! and cleanup batches, collecting every step into a [`fleet::BatchReport`].

pub mod config;
pub mod engine;
pub mod fleet;
pub mod signal;
