//! Error types for watch setup and configuration

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned synchronously when starting a watch or loading settings
///
/// Failures that happen after a watch is running (notifier errors, reload
/// failures) are logged by the session and never surface here.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The change notifier could not begin watching the path
    #[error("failed to watch {}: {message}", path.display())]
    Setup { path: PathBuf, message: String },

    /// An empty path was given to start a watch
    #[error("watch path must not be empty")]
    EmptyPath,

    /// The watch was started outside of a Tokio runtime
    #[error("watch must be started from within a Tokio runtime")]
    NoRuntime,

    /// A setting is outside its valid range
    #[error("invalid config value for `{field}`: {message}")]
    InvalidConfig { field: &'static str, message: String },

    /// The settings file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`WatchConfig`](crate::WatchConfig)
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl WatchError {
    pub(crate) fn setup(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Setup {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Errors reported by a change notifier for an already active watch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifierError {
    /// The watched file was removed
    #[error("watched file {} was removed", .0.display())]
    Removed(PathBuf),

    /// The notification backend reported a failure
    #[error("notifier error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_mentions_path() {
        let err = WatchError::setup("/etc/app/config.toml", "No such file or directory");
        let msg = err.to_string();
        assert!(msg.contains("/etc/app/config.toml"));
        assert!(msg.contains("No such file or directory"));
    }

    #[test]
    fn test_removed_error_message() {
        let err = NotifierError::Removed(PathBuf::from("/tmp/app.toml"));
        assert_eq!(err.to_string(), "watched file /tmp/app.toml was removed");
    }
}
