//! Package documents (OPF).
//!
//! A package document describes one rendition of the publication: its
//! `<package>` attributes, metadata, manifest of resources and the spine that
//! orders them for reading.

mod manifest;
mod metadata;

use std::collections::BTreeMap;
use std::io::Read;

use serde::Serialize;
use tracing::trace;
use xml::attribute::OwnedAttribute;
use xml::name::OwnedName;
use xml::reader::{EventReader, XmlEvent};

use crate::error::{Error, Result};

pub use manifest::{
    Manifest, ManifestItem, Spine, SpineItem, COVER_IMAGE_PROPERTY, NAV_PROPERTY,
};
pub use metadata::{Identifier, Meta, Metadata, DC_NAMESPACE, MODIFIED_PROPERTY};

use metadata::PendingText;

/// Base text direction of the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dir {
    /// Left to right.
    Ltr,
    /// Right to left.
    Rtl,
}

/// A parsed package document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDocument {
    /// Archive path of the package document.
    pub path: String,
    /// Attributes of the `<package>` element, keyed by qualified name.
    attributes: BTreeMap<String, String>,
    /// The `unique-identifier` attribute (an IDREF into the metadata).
    pub unique_identifier: String,
    /// The `version` attribute.
    pub version: String,
    /// Publication metadata.
    pub metadata: Metadata,
    /// Publication resources.
    pub manifest: Manifest,
    /// Reading order.
    pub spine: Spine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Metadata,
    Manifest,
    Spine,
}

impl PackageDocument {
    /// Parse a package document read from `path` in the archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the XML is malformed, the root `<package>` element
    /// is missing, or it lacks `unique-identifier` or `version`.
    pub fn parse<R: Read>(path: impl Into<String>, source: R) -> Result<Self> {
        let path = path.into();
        let parser = EventReader::new(source);

        let mut package_attributes: Option<Vec<OwnedAttribute>> = None;
        let mut metadata = Metadata::default();
        let mut manifest = Manifest::default();
        let mut spine = Spine::default();
        let mut section = Section::Other;
        let mut pending: Option<PendingText> = None;
        let mut depth = 0usize;

        for event in parser {
            match event? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    depth += 1;
                    let in_package = package_attributes.is_some();
                    match (depth, name.local_name.as_str()) {
                        (1, "package") => package_attributes = Some(attributes),
                        (2, "metadata") if in_package => section = Section::Metadata,
                        (2, "manifest") if in_package => section = Section::Manifest,
                        (2, "spine") if in_package => {
                            section = Section::Spine;
                            spine = Spine::from_attributes(&attributes);
                        }
                        (3, local) => match section {
                            Section::Metadata => {
                                pending = metadata.start_element(&name, &attributes);
                            }
                            Section::Manifest if local == "item" => {
                                manifest.push(ManifestItem::from_attributes(&attributes));
                            }
                            Section::Spine if local == "itemref" => {
                                spine.itemrefs.push(SpineItem::from_attributes(&attributes));
                            }
                            _ => {}
                        },
                        _ => {}
                    }
                }
                XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                    if let Some(pending) = pending.as_mut() {
                        pending.text.push_str(&text);
                    }
                }
                XmlEvent::EndElement { .. } => {
                    match depth {
                        3 => {
                            if let Some(pending) = pending.take() {
                                metadata.finish(pending);
                            }
                        }
                        2 => section = Section::Other,
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }

        let attributes: BTreeMap<String, String> = package_attributes
            .ok_or_else(|| Error::package_document(&path, "Package element not found."))?
            .into_iter()
            .map(|attr| (qualified_name(&attr.name), attr.value))
            .collect();

        let unique_identifier = attributes
            .get("unique-identifier")
            .cloned()
            .ok_or_else(|| {
                Error::package_document(&path, "unique-identifier attribute is undefined.")
            })?;

        let version = attributes
            .get("version")
            .cloned()
            .ok_or_else(|| Error::package_document(&path, "version attribute is undefined."))?;

        trace!(
            "Parsed package document {path}: version {version}, {} manifest items, {} spine items",
            manifest.len(),
            spine.itemrefs.len()
        );

        Ok(Self {
            path,
            attributes,
            unique_identifier,
            version,
            metadata,
            manifest,
            spine,
        })
    }

    /// The `dir` attribute.
    #[must_use]
    pub fn dir(&self) -> Option<Dir> {
        match self.attributes.get("dir").map(String::as_str) {
            Some("ltr") => Some(Dir::Ltr),
            Some("rtl") => Some(Dir::Rtl),
            _ => None,
        }
    }

    /// The `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// The `prefix` attribute.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.attribute("prefix")
    }

    /// The `xml:lang` attribute.
    #[must_use]
    pub fn xml_lang(&self) -> Option<&str> {
        self.attribute("xml:lang")
    }

    /// Any `<package>` attribute by qualified name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether this is an EPUB 3 package.
    #[must_use]
    pub fn is_epub3(&self) -> bool {
        self.version.starts_with('3')
    }

    /// The `dc:identifier` referenced by `unique-identifier`.
    #[must_use]
    pub fn unique_identifier_value(&self) -> Option<&str> {
        self.metadata
            .identifiers
            .iter()
            .find(|ident| ident.id.as_deref() == Some(self.unique_identifier.as_str()))
            .map(|ident| ident.value.as_str())
    }

    /// The cover image item, via the `cover-image` property or the EPUB 2
    /// `<meta name="cover">` convention.
    #[must_use]
    pub fn cover_image(&self) -> Option<&ManifestItem> {
        self.manifest
            .find_by_property(COVER_IMAGE_PROPERTY)
            .or_else(|| self.manifest.get(self.metadata.meta("cover")?))
    }

    /// Directory of the package document within the archive (no trailing
    /// slash, empty at the root).
    #[must_use]
    pub fn base_dir(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Resolve an href from this document to an archive path.
    #[must_use]
    pub fn resolve_href(&self, href: &str) -> String {
        resolve_href(self.base_dir(), href)
    }
}

/// Join `href` onto `base_dir` and normalise it to an archive path.
///
/// Fragments are dropped, `%XX` escapes decoded, and `.`/`..` segments
/// collapsed. `..` never climbs above the archive root.
#[must_use]
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();

    let mut segments: Vec<String> = if href.starts_with('/') {
        Vec::new()
    } else {
        base_dir
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };

    // Decode per segment so `%2F` stays inside its segment.
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(percent_decode(s)),
        }
    }

    segments.join("/")
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn qualified_name(name: &OwnedName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{prefix}:{}", name.local_name),
        None => name.local_name.clone(),
    }
}
