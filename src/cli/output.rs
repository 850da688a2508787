//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{CliError, FsError};

/// Map domain errors to a one-line message for the terminal.
pub fn map_error(e: &CliError) -> String {
    match e {
        CliError::Fs(FsError::NotFound(path)) => format!("{}: no such file or directory", path),
        CliError::Fs(FsError::AlreadyExists(path)) => format!("{}: already exists", path),
        other => other.to_string(),
    }
}
