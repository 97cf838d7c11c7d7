//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while reading and parsing an event log
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed event on line {line}: {reason} (\"{content}\")")]
    MalformedEvent {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Failed to read event log: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub(crate) fn malformed(line: usize, content: &str, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            line,
            content: content.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during aggregation, layout and flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Missing start offset for node {label:?} at depth {depth} (end {end_offset})")]
    MissingStartTime {
        label: String,
        depth: usize,
        end_offset: f64,
    },

    #[error("Profile has no recorded weight, nothing to lay out")]
    EmptyLog,

    #[error("Stack paths must be sorted: {current:?} arrived after {previous:?}")]
    UnsortedInput {
        previous: Vec<String>,
        current: Vec<String>,
    },
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur while loading a render configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("Config TOML parse error: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Invalid render configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_input_error(err: &FlamegraphError) -> bool {
        match err {
            FlamegraphError::EmptyLog | FlamegraphError::UnsortedInput { .. } => true,
            FlamegraphError::MissingStartTime { .. } => false,
        }
    }

    #[test]
    fn test_flamegraph_error_messages() {
        let missing = FlamegraphError::MissingStartTime {
            label: "f".to_string(),
            depth: 2,
            end_offset: 1.5,
        };
        assert_eq!(
            missing.to_string(),
            "Missing start offset for node \"f\" at depth 2 (end 1.5)"
        );
        assert!(!is_input_error(&missing));
        assert!(is_input_error(&FlamegraphError::EmptyLog));
    }
}
