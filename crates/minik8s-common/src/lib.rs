//! # minik8s-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the minik8s pod runtime workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and carries the label namespace that every engine
//! container managed by minik8s is tagged with.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
