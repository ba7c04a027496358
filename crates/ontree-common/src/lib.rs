//! # ontree-common
//!
//! Shared types, error definitions, configuration models, constants and
//! the container naming scheme used across the ontree workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and never performs I/O in its naming functions, so every
//! higher layer can call them freely from any thread.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod naming;
pub mod types;
