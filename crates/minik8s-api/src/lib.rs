//! # minik8s-api
//!
//! The declarative Pod object consumed by the runtime.
//!
//! Handles:
//! - **Pod**: metadata, volumes, containers, restart policy.
//! - **Container**: image, env, ports, mounts, resources, probes.
//! - **Status**: pod phase and per-container states owned by the status reporter.
//! - **Manifest**: YAML/JSON loading in the Kubernetes camelCase layout.
//! - **Validator**: semantic checks run after loading.
//! - **Quantity**: CPU and memory quantity parsing.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod manifest;
pub mod pod;
pub mod quantity;
pub mod status;
pub mod validator;

pub use container::{
    Container, ContainerPort, EnvVar, Handler, HttpGetAction, Lifecycle, Probe,
    ResourceList, ResourceRequirements, VolumeMount,
};
pub use pod::{HostVolume, ObjectMeta, Pod, PodSpec};
pub use status::{ContainerState, ContainerStatus, PodPhase, PodStatus};
