#![forbid(unsafe_code)]

//! Errors surfaced by the broker.
//!
//! Only argument validation is an error. Liveness and cleanup conditions
//! (stale subscriptions, dead listeners, cross-thread teardown) are handled
//! internally and never reach callers.

use std::fmt;

/// Errors from broker operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// A source or listener argument is absent: its handle no longer
    /// resolves, or its bound target is dead.
    InvalidArgument {
        /// Parameter name (`"source"` or `"listener"`).
        param: &'static str,
        /// Why the argument was rejected.
        reason: &'static str,
    },
}

impl BrokerError {
    pub(crate) fn invalid(param: &'static str, reason: &'static str) -> Self {
        Self::InvalidArgument { param, reason }
    }

    /// Short stable label for logs.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
        }
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { param, reason } => {
                write!(f, "invalid argument '{param}': {reason}")
            }
        }
    }
}

impl std::error::Error for BrokerError {}
