//! Container runtime access and legacy migration for ontree.
//!
//! - [`client`]: the runtime capability the platform consumes
//!   (list, inspect, stop, start, rename) and a `docker` CLI implementation.
//! - [`migrate`]: the operator-triggered sweep that upgrades legacy
//!   single-container applications to the multi-service layout.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod client;
pub mod layout;
pub mod migrate;
pub mod secrets;
pub mod synth;
