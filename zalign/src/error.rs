//! Error types for z-alignment.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while aligning a tile set.
#[derive(Debug, Error)]
pub enum Error {
    #[error("No tiles provided for alignment")]
    EmptyTileSet,

    #[error("Reference tile {index} is out of range for {count} tiles")]
    ReferenceOutOfRange { index: usize, count: usize },

    #[error("Failed to load volume for tile '{tile}': {source}")]
    Load {
        tile: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to access curve cache '{path}': {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed curve cache '{path}': {reason}")]
    CacheFormat { path: PathBuf, reason: String },

    #[error("Failed to access results file '{path}': {source}")]
    ResultIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed results file '{path}' at line {line}: {reason}")]
    ResultFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to read config '{path}': {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
