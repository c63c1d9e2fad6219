//! Error taxonomy for rollup computations.
//!
//! Three families: validation errors raised before any network access,
//! unknown-strategy errors, and upstream errors from the remote directory.
//! Every failure aborts the whole computation for that request; there is no
//! partial-result or retry behavior.

use thiserror::Error;

/// Errors produced by the directory client and the rollup engine.
#[derive(Debug, Error)]
pub enum RollupError {
    /// A required request parameter was missing or empty.
    #[error("{0} is required")]
    MissingParameter(&'static str),

    /// A relationship strategy name outside the recognized set was requested.
    #[error("Unknown relationship strategy: '{0}'")]
    UnknownStrategy(String),

    /// The remote directory answered with a non-success status.
    #[error("{context}: {status} - {body}")]
    Upstream {
        /// What the failing call was doing (e.g. "Failed to fetch work item")
        context: &'static str,
        /// HTTP status code returned by the remote system
        status: u16,
        /// Response body, as diagnostic text
        body: String,
    },

    /// Transport-level failure before a response was received.
    #[error("{context}: {source}")]
    Transport {
        /// What the failing call was doing
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl RollupError {
    /// Whether this error was raised by request validation rather than by
    /// the remote directory. Serving layers map validation errors to 4xx
    /// responses and everything else to 5xx.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RollupError::MissingParameter(_) | RollupError::UnknownStrategy(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_names_the_field() {
        let err = RollupError::MissingParameter("Work item ID");
        assert_eq!(err.to_string(), "Work item ID is required");
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_strategy_names_the_value() {
        let err = RollupError::UnknownStrategy("both-directions".to_string());
        assert!(err.to_string().contains("both-directions"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_upstream_is_not_validation() {
        let err = RollupError::Upstream {
            context: "Failed to fetch work item",
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(!err.is_validation());
        assert!(err.to_string().contains("Failed to fetch work item"));
        assert!(err.to_string().contains("503"));
    }
}
