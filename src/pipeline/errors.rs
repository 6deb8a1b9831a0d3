/// Errors that end an invocation before any output is produced.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;

/// Exit code: success, or parse trouble the user chose to ignore.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code: the engine reported parse trouble and it was not ignored.
pub const EXIT_FORMAT_ERROR: i32 = 1;
/// Exit code: bad command line (matches clap's own usage-error code).
pub const EXIT_USAGE: i32 = 2;
/// Exit code: input could not be read or output could not be written.
pub const EXIT_IO: i32 = 3;

/// Failures that stop the pipeline.
#[derive(Debug, Error)]
pub enum CliError {
    /// An encoding label no encoding answers to.
    #[error("Unknown {direction} encoding '{label}'")]
    UnknownEncoding {
        /// "input" or "output".
        direction: &'static str,
        label: String,
    },

    /// The engine rejected an option value.
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Could not read input file '{}': {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not read standard input: {0}")]
    ReadStdin(#[source] io::Error),

    #[error("Could not write output file '{}': {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not write standard output: {0}")]
    WriteStdout(#[source] io::Error),
}

impl CliError {
    /// Return the process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownEncoding { .. } | Self::Engine(_) => EXIT_USAGE,
            Self::ReadFile { .. }
            | Self::ReadStdin(_)
            | Self::WriteFile { .. }
            | Self::WriteStdout(_) => EXIT_IO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let usage = CliError::UnknownEncoding {
            direction: "input",
            label: "klingon".to_owned(),
        };
        let unreadable = CliError::ReadFile {
            path: PathBuf::from("missing.sql"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(usage.exit_code(), EXIT_USAGE);
        assert_eq!(unreadable.exit_code(), EXIT_IO);
        assert_ne!(EXIT_FORMAT_ERROR, EXIT_USAGE);
        assert_ne!(EXIT_FORMAT_ERROR, EXIT_IO);
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = CliError::WriteFile {
            path: PathBuf::from("/nope/out.sql"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("/nope/out.sql"));
    }
}
