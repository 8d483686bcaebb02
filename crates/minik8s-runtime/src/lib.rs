//! # minik8s-runtime
//!
//! Turns a declarative pod into container engine calls.
//!
//! Handles:
//! - **Engine**: the [`engine::ContainerEngine`] seam and a Docker client. The
//!   `testing` feature adds an in-memory fake.
//! - **Images**: pull-policy resolution.
//! - **Labels**: identity labels addressing a pod's engine containers.
//! - **Volumes**: mount-to-bind resolution.
//! - **Sandbox**: the pause container holding the pod's namespaces.
//! - **Containers**: ordinary containers joined to the sandbox.
//! - **Orchestrator**: whole-pod creation and concurrent teardown.
//! - **Status**: the status reporter seam and an in-memory cache.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cancel;
pub mod container;
pub mod engine;
pub mod image;
pub mod labels;
pub mod orchestrator;
pub mod sandbox;
pub mod stats;
pub mod status;
pub mod volume;

pub use container::ContainerController;
pub use engine::ContainerEngine;
pub use engine::docker::DockerEngine;
#[cfg(any(test, feature = "testing"))]
pub use engine::fake::FakeEngine;
pub use image::ImageResolver;
pub use labels::SandboxToken;
pub use orchestrator::PodOrchestrator;
pub use sandbox::{SandboxConfig, SandboxController};
pub use stats::{ContainerStats, PodStats};
pub use status::{StatusCache, StatusReporter};
