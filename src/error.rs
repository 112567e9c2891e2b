use thiserror::Error;

use crate::classfile::error::{ClassFileError, FrameError};

/// Result type for jremap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the archive remapper
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Missing entry: {name}")]
    MissingEntry { name: String },

    #[error("Malformed mapping for {element}: {message}")]
    MalformedMapping { element: String, message: String },

    #[error("Write conflict: {sources:?} all map to {destination}")]
    WriteConflict { destination: String, sources: Vec<String> },

    #[error("Class format error: {0}")]
    ClassFormat(#[from] ClassFileError),

    #[error("Frame computation error: {0}")]
    Frame(#[from] FrameError),

    #[error("Failed to transform {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a missing entry error
    pub fn missing_entry(name: impl Into<String>) -> Self {
        Self::MissingEntry { name: name.into() }
    }

    /// Create a malformed mapping error for a class, method or field
    pub fn malformed_mapping(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedMapping { element: element.into(), message: message.into() }
    }

    /// Attach the archive entry name to an error raised while processing it
    pub fn in_entry(self, name: impl Into<String>) -> Self {
        Self::Entry { name: name.into(), source: Box::new(self) }
    }
}
