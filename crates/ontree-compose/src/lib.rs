//! # ontree-compose
//!
//! Admission control for user-authored bundle definitions.
//!
//! Handles:
//! - **Model**: Typed parse of `docker-compose.yml` (services, named volumes, networks).
//! - **Policy**: Capability denylist and per-application bind-mount scoping.
//! - **Validator**: Fail-fast accept/reject of a bundle for one application.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod error;
pub mod model;
pub mod policy;
pub mod validator;

pub use error::{ComposeError, ValidationError};
pub use validator::Validator;
