//! Errors raised while admitting a bundle definition.

use thiserror::Error;

/// A sandbox policy violation in one service.
///
/// `detail` is written for end users and is shown to them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("security violation in service '{service}': {rule}: {detail}")]
pub struct ValidationError {
    /// Service that violated the policy.
    pub service: String,
    /// Rule that was violated.
    pub rule: String,
    /// Explanation of the violation.
    pub detail: String,
}

impl ValidationError {
    pub(crate) fn new(service: &str, rule: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            service: service.to_owned(),
            rule: rule.into(),
            detail: detail.into(),
        }
    }
}

/// Reason a bundle was not admitted.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The text is not a valid bundle document.
    #[error("failed to parse docker-compose.yml: {source}")]
    Parse {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// The bundle violates the sandbox policy.
    #[error(transparent)]
    Violation(#[from] ValidationError),
}

impl ComposeError {
    /// The policy violation, if this is one.
    #[must_use]
    pub const fn violation(&self) -> Option<&ValidationError> {
        match self {
            Self::Violation(v) => Some(v),
            Self::Parse { .. } => None,
        }
    }
}
