/*!
 * Error types for the ass-font-replacer application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when persisting or validating the font configuration
///
/// Corrupt and legacy configuration files are recovered inside the store and
/// never show up here.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be written
    #[error("Failed to write configuration to {path:?}: {source}")]
    Persist {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The configuration could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The configuration holds values that cannot drive a batch
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur while running a batch
#[derive(Error, Debug)]
pub enum BatchError {
    /// The input directory is missing or holds no `.ass` files
    #[error("No input selected: no .ass files found under {path:?}")]
    NoInputSelected {
        /// Directory that was searched; empty when a job was built without files
        path: PathBuf,
    },

    /// The output directory could not be created
    #[error("Output directory {path:?} is not writable: {source}")]
    OutputDirUnwritable {
        /// Requested output directory
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The output directory holds one of the input files
    #[error("Output directory {path:?} contains input files; refusing to rewrite in place")]
    OutputOverlapsInput {
        /// Requested output directory
        path: PathBuf,
    },

    /// Walking the input directory failed
    #[error("Failed to scan {path:?}: {message}")]
    Discovery {
        /// Directory being scanned
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// A subtitle file could not be read or decoded
    #[error("Failed to read subtitle file {path:?}: {source}")]
    FileRead {
        /// Offending input file
        path: PathBuf,
        /// Underlying I/O or decoding error
        source: std::io::Error,
    },

    /// A rewritten subtitle file could not be written
    #[error("Failed to write subtitle file {path:?}: {source}")]
    FileWrite {
        /// Output file that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The run was cancelled between two files
    #[error("Batch cancelled after {processed} file(s)")]
    Cancelled {
        /// Number of files fully written before cancellation
        processed: usize,
    },
}

impl BatchError {
    /// Path of the file or directory the error refers to, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NoInputSelected { path }
            | Self::OutputDirUnwritable { path, .. }
            | Self::OutputOverlapsInput { path }
            | Self::Discovery { path, .. }
            | Self::FileRead { path, .. }
            | Self::FileWrite { path, .. } => Some(path),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the configuration store
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Error from a batch run
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
