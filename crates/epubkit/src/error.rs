//! Error types for epubkit.
//!
//! This module defines all error types used throughout the epubkit crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for epubkit operations.
#[derive(Error, Debug)]
pub enum Error {
    // === OCF Container Errors ===
    /// The `mimetype` entry is missing or has the wrong content.
    #[error("mimetype error: {message}")]
    Mimetype {
        /// Description of what went wrong.
        message: String,
    },

    /// `META-INF/container.xml` is malformed or incomplete.
    #[error("container error: {message}")]
    Container {
        /// Description of what went wrong.
        message: String,
    },

    /// No readable package document was found in the publication.
    #[error("publication has no readable package document")]
    NoPackageDocument,

    // === Package Document Errors ===
    /// A package document is missing required structure.
    #[error("package document error in {path}: {message}")]
    PackageDocument {
        /// Archive path of the package document.
        path: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A manifest item id does not exist.
    #[error("manifest item not found: {id}")]
    ManifestItemNotFound {
        /// The id that was looked up.
        id: String,
    },

    /// An extension or MIME string is not an EPUB core media type.
    #[error("unsupported media type: {value}")]
    MediaType {
        /// The offending extension or MIME string.
        value: String,
    },

    // === Archive Errors ===
    /// Failed to open the publication file.
    #[error("failed to open publication at {path}: {source}")]
    Open {
        /// Path to the publication.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The ZIP layer failed.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An archive entry does not exist.
    #[error("entry not found in archive: {name}")]
    EntryNotFound {
        /// The entry name that was looked up.
        name: String,
    },

    /// An archive entry is larger than the configured limit.
    #[error("entry {name} is {size} bytes, which exceeds the limit of {limit} bytes")]
    EntryTooLarge {
        /// The entry name.
        name: String,
        /// Uncompressed size of the entry.
        size: u64,
        /// The limit that was exceeded.
        limit: u64,
    },

    /// An archive entry expected to be text is not valid UTF-8.
    #[error("entry {name} is not valid UTF-8")]
    EntryNotUtf8 {
        /// The entry name.
        name: String,
    },

    // === XML Errors ===
    /// The XML parser rejected a document.
    #[error("XML error: {0}")]
    Xml(#[from] xml::reader::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for epubkit operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new mimetype error.
    #[must_use]
    pub fn mimetype(message: impl Into<String>) -> Self {
        Self::Mimetype {
            message: message.into(),
        }
    }

    /// Create a new container error.
    #[must_use]
    pub fn container(message: impl Into<String>) -> Self {
        Self::Container {
            message: message.into(),
        }
    }

    /// Create a new package document error.
    #[must_use]
    pub fn package_document(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PackageDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new media type error.
    #[must_use]
    pub fn media_type(value: impl Into<String>) -> Self {
        Self::MediaType {
            value: value.into(),
        }
    }

    /// Check if this error means something looked up by name was absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntryNotFound { .. }
                | Self::ManifestItemNotFound { .. }
                | Self::Zip(zip::result::ZipError::FileNotFound)
        )
    }
}
