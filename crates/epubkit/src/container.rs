//! OCF container handling.
//!
//! An EPUB is a ZIP archive whose first entry is an uncompressed `mimetype`
//! file and which carries `META-INF/container.xml` pointing at one or more
//! package documents.

use std::io::Read;

use serde::Serialize;
use tracing::trace;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, XmlEvent};

use crate::error::{Error, Result};

/// Archive path of the mimetype entry.
pub const MIMETYPE_PATH: &str = "mimetype";

/// Required content of the mimetype entry.
pub const MIMETYPE_CONTENT: &str = "application/epub+zip";

/// Archive path of the container document.
pub const CONTAINER_XML_PATH: &str = "META-INF/container.xml";

/// Media type of an OPF package document.
pub const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// A `<rootfile>` entry of the container document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rootfile {
    /// Archive path of the package document.
    pub full_path: String,
    /// Declared media type, normally [`PACKAGE_MEDIA_TYPE`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// The parsed container document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    /// Rootfiles with a usable `full-path`, in document order.
    pub rootfiles: Vec<Rootfile>,
    /// Number of `<rootfile>` elements without a usable `full-path`.
    pub invalid_rootfiles: usize,
}

impl Container {
    /// Parse a container document.
    ///
    /// `<rootfile>` elements without a `full-path` are counted but otherwise
    /// skipped; use [`Container::into_rootfiles`] to reject them.
    ///
    /// # Errors
    ///
    /// Returns an error if the XML is malformed.
    pub fn parse<R: Read>(source: R) -> Result<Self> {
        let parser = EventReader::new(source);
        let mut container = Self::default();

        for event in parser {
            let XmlEvent::StartElement {
                name, attributes, ..
            } = event?
            else {
                continue;
            };
            if name.local_name != "rootfile" {
                continue;
            }

            match attribute(&attributes, "full-path").filter(|p| !p.is_empty()) {
                Some(full_path) => {
                    trace!("Found rootfile {full_path}");
                    container.rootfiles.push(Rootfile {
                        full_path: full_path.to_string(),
                        media_type: attribute(&attributes, "media-type").map(str::to_string),
                    });
                }
                None => container.invalid_rootfiles += 1,
            }
        }

        Ok(container)
    }

    /// Return the rootfiles, failing if any `<rootfile>` lacked a path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Container`] if a `<rootfile>` has no `full-path`.
    pub fn into_rootfiles(self) -> Result<Vec<Rootfile>> {
        if self.invalid_rootfiles > 0 {
            return Err(Error::container(
                "Full-path of package document is undefined in <rootfile>",
            ));
        }
        Ok(self.rootfiles)
    }
}

/// Parse a container document strictly.
///
/// # Errors
///
/// Returns an error if the XML is malformed or a `<rootfile>` has no
/// `full-path`.
pub fn parse_container<R: Read>(source: R) -> Result<Vec<Rootfile>> {
    Container::parse(source)?.into_rootfiles()
}

/// Outcome of a successful mimetype check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimetypeStatus {
    /// Whether the entry was stored without compression.
    pub stored: bool,
}

/// Validate the first archive entry as the OCF mimetype file.
///
/// # Errors
///
/// Returns [`Error::Mimetype`] if the entry is not named `mimetype` or its
/// content is not exactly `application/epub+zip`.
pub fn check_mimetype_entry(name: &str, content: &[u8], stored: bool) -> Result<MimetypeStatus> {
    if name != MIMETYPE_PATH {
        return Err(Error::mimetype(format!(
            "The mimetype not found as the first entry (found `{name}`)"
        )));
    }

    let content = std::str::from_utf8(content).map_err(|e| Error::mimetype(e.to_string()))?;
    if content != MIMETYPE_CONTENT {
        return Err(Error::mimetype(format!(
            "The mimetype file's content {content:?} is invalid. It MUST be `{MIMETYPE_CONTENT}`."
        )));
    }

    Ok(MimetypeStatus { stored })
}

/// Find an unprefixed attribute by local name.
pub(crate) fn attribute<'a>(attributes: &'a [OwnedAttribute], local_name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.prefix.is_none() && a.name.local_name == local_name)
        .map(|a| a.value.as_str())
}
