//! Error types shared by every processing element and renderer.

use std::path::PathBuf;

use thiserror::Error;

use crate::extent::Extent;

/// Errors raised while building or rendering a graph.
///
/// Errors are raised at the call site that detects them and are never
/// retried. Sample-rate mismatches are not errors: they are logged.
#[derive(Error, Debug)]
pub enum Error {
    /// A source file could not be parsed or uses an unsupported encoding.
    #[error("cannot read audio file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// A finite extent was required but the stream is open on at least one side.
    #[error("{operation} requires a finite extent, got {extent}")]
    Extent {
        operation: &'static str,
        extent: Extent,
    },

    /// A stateful element was asked to render out of order.
    #[error("{node} expected render to start at frame {expected}, got {actual}")]
    NonContiguous {
        node: &'static str,
        expected: i64,
        actual: i64,
    },

    /// An invalid DSP or graph parameter.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The output device could not be opened or driven.
    #[error("audio device error: {0}")]
    Device(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure while writing a WAV file.
    #[error(transparent)]
    Wav(#[from] hound::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
