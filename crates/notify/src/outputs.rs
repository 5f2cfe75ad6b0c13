//! Step outputs written back to the CI runner.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::DispatchResult;

/// Errors writing step outputs.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not write outputs to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A newline would corrupt the `key=value` file format
    #[error("output {key} contains a line break")]
    InvalidValue { key: String },
}

/// Which dispatch path an output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Direct,
    Channel,
}

impl DispatchKind {
    /// Output keys for the message timestamp and the target ID.
    #[must_use]
    pub const fn keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Direct => ("direct_message_id", "direct_user_id"),
            Self::Channel => ("channel_message_id", "channel_id"),
        }
    }
}

/// Appends `key=value` lines to the runner's output file.
#[derive(Debug, Clone, Default)]
pub struct CiOutputs {
    path: Option<PathBuf>,
}

impl CiOutputs {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record the identifiers of a delivered message.
    ///
    /// Failures are logged; outputs never fail a run.
    pub fn record_dispatch(&self, kind: DispatchKind, result: &DispatchResult) {
        let (message_key, target_key) = kind.keys();
        let entries = [
            (message_key, result.timestamp.as_str()),
            (target_key, result.target_id.as_str()),
        ];

        if let Err(e) = self.write_all(&entries) {
            warn!(error = %e, "Could not write step outputs");
        }
    }

    /// Append entries to the output file in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if a value contains a line break or the file cannot be
    /// appended to.
    pub fn write_all(&self, entries: &[(&str, &str)]) -> Result<(), OutputError> {
        let mut buf = String::new();
        for (key, value) in entries {
            if key.contains(['\n', '\r']) || value.contains(['\n', '\r']) {
                return Err(OutputError::InvalidValue {
                    key: (*key).to_string(),
                });
            }
            info!(key, value, "Setting output");
            buf.push_str(key);
            buf.push('=');
            buf.push_str(value);
            buf.push('\n');
        }

        let Some(path) = &self.path else {
            info!("No $GITHUB_OUTPUT set, skipping output writing");
            return Ok(());
        };

        debug!(path = %path.display(), "Appending step outputs");

        let io_err = |source| OutputError::Io {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        file.write_all(buf.as_bytes()).map_err(io_err)
    }
}
