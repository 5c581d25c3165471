use std::io;

use crate::fourcc::FourCc;

/// Specialized Result type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a whole decode.
///
/// Only the container header can fail this way; anything wrong inside a chunk
/// becomes a [`Diagnostic`] on the decoded record instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unrecognized container identifier: {0}")]
    UnrecognizedContainer(FourCc),
    /// `found` is the identifier that sat where `ds64` must be, or "end of stream".
    #[error("Expected 'ds64' chunk after a 64-bit size header, found {found}")]
    MissingDs64 { found: String },
    #[error("Unsupported input: {0}")]
    Unsupported(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised by a single chunk decoder.
///
/// The registry never propagates these; it attaches them to the offending slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("payload truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("{0}")]
    Malformed(&'static str),
}

/// A non-fatal structural finding attached to a decoded record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -- {}", self.location, self.message)
    }
}
