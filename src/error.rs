//! Error types for the tail engine.

use thiserror::Error;

/// Errors that abort a tail session.
#[derive(Debug, Error)]
pub enum TailError {
    /// The stream pattern matched more streams than one filter call accepts.
    #[error("pattern {pattern:?} matched {matched} streams, more than the limit of {limit}")]
    TooManyStreams {
        pattern: String,
        matched: usize,
        limit: usize,
    },

    /// The stream pattern matched nothing.
    #[error("no streams matched pattern {pattern:?}")]
    NoStreamsMatched { pattern: String },

    /// The stream pattern is not a valid regular expression.
    #[error("invalid stream pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A time bound could not be parsed.
    #[error("invalid time {input:?}: {reason}")]
    InvalidTime { input: String, reason: String },

    #[error("no log group name specified")]
    MissingLogGroup,

    /// The upstream call failed (transport, auth, quota).
    #[error("{operation} failed: {source}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The consumer of a running session dropped its receiver.
    #[error("tail output channel closed")]
    ChannelClosed,
}

impl TailError {
    pub fn upstream<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream {
            operation,
            source: Box::new(err),
        }
    }

    /// Validation errors are detected before any fetch is issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::TooManyStreams { .. }
                | Self::NoStreamsMatched { .. }
                | Self::InvalidPattern { .. }
                | Self::InvalidTime { .. }
                | Self::MissingLogGroup
        )
    }
}

pub type Result<T> = std::result::Result<T, TailError>;
