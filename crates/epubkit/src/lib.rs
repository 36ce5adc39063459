//! `epubkit` - EPUB container reader and conformance checker
//!
//! This library reads the OCF container of an EPUB publication, parses its
//! package documents (metadata, manifest and spine), gives access to the
//! archive entries and checks the publication against the core container and
//! package rules.
//!
//! ```no_run
//! use epubkit::EpubReader;
//!
//! # fn main() -> epubkit::Result<()> {
//! let mut reader = EpubReader::open("book.epub")?;
//! let package = reader.require_package_document()?;
//! println!("{:?}", package.metadata.title());
//! let first = reader.read_entry_to_string("OEBPS/text/c1.xhtml")?;
//! # let _ = first;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod check;
pub mod cli;
pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod media_type;
pub mod package;
pub mod reader;

#[cfg(test)]
mod testing;

pub use check::{check, check_file, CheckOptions, Report};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use media_type::MediaType;
pub use package::PackageDocument;
pub use reader::EpubReader;
