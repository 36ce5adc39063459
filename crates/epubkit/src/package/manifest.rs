//! Manifest (`<manifest>`) and spine (`<spine>`).

use std::collections::HashSet;

use serde::Serialize;
use xml::attribute::OwnedAttribute;

use crate::container::attribute;
use crate::media_type::MediaType;

/// Manifest property marking the navigation document.
pub const NAV_PROPERTY: &str = "nav";

/// Manifest property marking the cover image.
pub const COVER_IMAGE_PROPERTY: &str = "cover-image";

/// A publication resource declared in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestItem {
    /// The `id` attribute.
    pub id: String,
    /// The `href` attribute, relative to the package document.
    pub href: String,
    /// The declared `media-type`.
    pub media_type: String,
    /// Space-separated `properties`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
    /// The `fallback` item id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// The `media-overlay` item id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_overlay: Option<String>,
}

impl ManifestItem {
    pub(crate) fn from_attributes(attributes: &[OwnedAttribute]) -> Self {
        let get = |name| attribute(attributes, name).map(str::to_string);
        Self {
            id: get("id").unwrap_or_default(),
            href: get("href").unwrap_or_default(),
            media_type: get("media-type").unwrap_or_default(),
            properties: split_properties(attribute(attributes, "properties")),
            fallback: get("fallback"),
            media_overlay: get("media-overlay"),
        }
    }

    /// Whether the item carries the given property.
    #[must_use]
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// The declared media type, if it is a core media type.
    #[must_use]
    pub fn core_media_type(&self) -> Option<MediaType> {
        self.media_type.parse().ok()
    }

    /// Whether the href points outside the container.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.href.contains("://")
    }
}

/// The publication manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    items: Vec<ManifestItem>,
}

impl Manifest {
    pub(crate) fn push(&mut self, item: ManifestItem) {
        self.items.push(item);
    }

    /// All items in document order.
    #[must_use]
    pub fn items(&self) -> &[ManifestItem] {
        &self.items
    }

    /// Iterate over items in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, ManifestItem> {
        self.items.iter()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the manifest is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// The first item carrying the given property.
    #[must_use]
    pub fn find_by_property(&self, property: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.has_property(property))
    }

    /// The EPUB 3 navigation document.
    #[must_use]
    pub fn nav(&self) -> Option<&ManifestItem> {
        self.find_by_property(NAV_PROPERTY)
    }

    /// Ids declared more than once, each reported once.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.items
            .iter()
            .map(|item| item.id.as_str())
            .filter(|id| !seen.insert(*id) && reported.insert(*id))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestItem;
    type IntoIter = std::slice::Iter<'a, ManifestItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A `<itemref>` in the spine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpineItem {
    /// The referenced manifest item id.
    pub idref: String,
    /// Whether the item is part of the default reading order.
    pub linear: bool,
    /// Space-separated `properties`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
}

impl SpineItem {
    pub(crate) fn from_attributes(attributes: &[OwnedAttribute]) -> Self {
        Self {
            idref: attribute(attributes, "idref").unwrap_or_default().to_string(),
            linear: attribute(attributes, "linear").map_or(true, |v| v.trim() != "no"),
            properties: split_properties(attribute(attributes, "properties")),
        }
    }
}

/// The reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Spine {
    /// EPUB 2 `toc` attribute (NCX item id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toc: Option<String>,
    /// `page-progression-direction` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_progression_direction: Option<String>,
    /// Item references in reading order.
    pub itemrefs: Vec<SpineItem>,
}

impl Spine {
    pub(crate) fn from_attributes(attributes: &[OwnedAttribute]) -> Self {
        Self {
            toc: attribute(attributes, "toc").map(str::to_string),
            page_progression_direction: attribute(attributes, "page-progression-direction")
                .map(str::to_string),
            itemrefs: Vec::new(),
        }
    }

    /// Itemrefs that belong to the default reading order.
    pub fn linear(&self) -> impl Iterator<Item = &SpineItem> {
        self.itemrefs.iter().filter(|item| item.linear)
    }

    /// Idrefs that appear more than once, each reported once.
    #[must_use]
    pub fn duplicate_idrefs(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.itemrefs
            .iter()
            .map(|item| item.idref.as_str())
            .filter(|idref| !seen.insert(*idref) && reported.insert(*idref))
            .collect()
    }
}

fn split_properties(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
