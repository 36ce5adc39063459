//! Package metadata (`<metadata>`).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use xml::attribute::OwnedAttribute;
use xml::name::OwnedName;

use crate::container::attribute;

/// Dublin Core elements namespace.
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Property name of the last-modified meta.
pub const MODIFIED_PROPERTY: &str = "dcterms:modified";

/// Format `dcterms:modified` must follow in EPUB 3.
const MODIFIED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A `dc:identifier` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    /// The element's `id` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The identifier text.
    pub value: String,
}

/// A `<meta>` element that is not otherwise interpreted.
///
/// EPUB 3 metas carry `property`, EPUB 2 metas carry `name`/`content`;
/// both are stored as a property/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meta {
    /// The `property` (EPUB 3) or `name` (EPUB 2) attribute.
    pub property: String,
    /// The element text (EPUB 3) or `content` attribute (EPUB 2).
    pub value: String,
    /// The `refines` attribute, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refines: Option<String>,
}

/// Publication metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// `dc:identifier` elements.
    pub identifiers: Vec<Identifier>,
    /// `dc:title` values.
    pub titles: Vec<String>,
    /// `dc:language` values.
    pub languages: Vec<String>,
    /// `dc:creator` values.
    pub creators: Vec<String>,
    /// `dc:contributor` values.
    pub contributors: Vec<String>,
    /// `dc:publisher`.
    pub publisher: Option<String>,
    /// `dc:description`.
    pub description: Option<String>,
    /// `dc:date`.
    pub date: Option<String>,
    /// `dc:subject` values.
    pub subjects: Vec<String>,
    /// `dc:rights`.
    pub rights: Option<String>,
    /// Raw `dcterms:modified` text.
    pub modified: Option<String>,
    /// Remaining metas.
    pub metas: Vec<Meta>,
}

/// A metadata element whose text is being collected.
#[derive(Debug)]
pub(crate) struct PendingText {
    field: Field,
    id: Option<String>,
    refines: Option<String>,
    pub(crate) text: String,
}

#[derive(Debug)]
enum Field {
    Identifier,
    Title,
    Language,
    Creator,
    Contributor,
    Publisher,
    Description,
    Date,
    Subject,
    Rights,
    Meta(String),
}

impl Metadata {
    /// The first title, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.titles.first().map(String::as_str)
    }

    /// The first language, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }

    /// Find a meta by property (or EPUB 2 name).
    #[must_use]
    pub fn meta(&self, property: &str) -> Option<&str> {
        self.metas
            .iter()
            .find(|m| m.property == property)
            .map(|m| m.value.as_str())
    }

    /// Parse `dcterms:modified` as a UTC timestamp.
    ///
    /// Returns `None` if the meta is absent or not in `CCYY-MM-DDThh:mm:ssZ`
    /// form.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        let modified = self.modified.as_deref()?;
        NaiveDateTime::parse_from_str(modified, MODIFIED_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Begin a child element of `<metadata>`.
    ///
    /// Returns a [`PendingText`] when the element's text should be
    /// collected. EPUB 2 `name`/`content` metas are recorded immediately.
    pub(crate) fn start_element(
        &mut self,
        name: &OwnedName,
        attributes: &[OwnedAttribute],
    ) -> Option<PendingText> {
        let is_dc = name.namespace.as_deref() == Some(DC_NAMESPACE)
            || name.prefix.as_deref() == Some("dc");

        let field = if is_dc {
            match name.local_name.as_str() {
                "identifier" => Field::Identifier,
                "title" => Field::Title,
                "language" => Field::Language,
                "creator" => Field::Creator,
                "contributor" => Field::Contributor,
                "publisher" => Field::Publisher,
                "description" => Field::Description,
                "date" => Field::Date,
                "subject" => Field::Subject,
                "rights" => Field::Rights,
                _ => return None,
            }
        } else if name.local_name == "meta" {
            if let Some(property) = attribute(attributes, "property") {
                Field::Meta(property.to_string())
            } else {
                if let (Some(meta_name), Some(content)) =
                    (attribute(attributes, "name"), attribute(attributes, "content"))
                {
                    self.metas.push(Meta {
                        property: meta_name.to_string(),
                        value: content.trim().to_string(),
                        refines: None,
                    });
                }
                return None;
            }
        } else {
            return None;
        };

        Some(PendingText {
            field,
            id: attribute(attributes, "id").map(str::to_string),
            refines: attribute(attributes, "refines").map(str::to_string),
            text: String::new(),
        })
    }

    /// Commit a finished element.
    pub(crate) fn finish(&mut self, pending: PendingText) {
        let value = pending.text.trim().to_string();
        if value.is_empty() {
            return;
        }

        match pending.field {
            Field::Identifier => self.identifiers.push(Identifier {
                id: pending.id,
                value,
            }),
            Field::Title => self.titles.push(value),
            Field::Language => self.languages.push(value),
            Field::Creator => self.creators.push(value),
            Field::Contributor => self.contributors.push(value),
            Field::Publisher => self.publisher = Some(value),
            Field::Description => self.description = Some(value),
            Field::Date => self.date = Some(value),
            Field::Subject => self.subjects.push(value),
            Field::Rights => self.rights = Some(value),
            Field::Meta(property) if property == MODIFIED_PROPERTY && pending.refines.is_none() => {
                self.modified = Some(value);
            }
            Field::Meta(property) => self.metas.push(Meta {
                property,
                value,
                refines: pending.refines,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc(local: &str) -> OwnedName {
        OwnedName {
            local_name: local.to_string(),
            namespace: Some(DC_NAMESPACE.to_string()),
            prefix: Some("dc".to_string()),
        }
    }

    fn attr(local: &str, value: &str) -> OwnedAttribute {
        OwnedAttribute {
            name: OwnedName::local(local),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_identifier_keeps_id() {
        let mut metadata = Metadata::default();
        let mut pending = metadata
            .start_element(&dc("identifier"), &[attr("id", "uid")])
            .unwrap();
        pending.text.push_str("  urn:uuid:1234 ");
        metadata.finish(pending);

        assert_eq!(
            metadata.identifiers,
            vec![Identifier {
                id: Some("uid".to_string()),
                value: "urn:uuid:1234".to_string(),
            }]
        );
    }

    #[test]
    fn test_whitespace_only_text_is_ignored() {
        let mut metadata = Metadata::default();
        let mut pending = metadata.start_element(&dc("title"), &[]).unwrap();
        pending.text.push_str("   \n ");
        metadata.finish(pending);
        assert!(metadata.titles.is_empty());
    }

    #[test]
    fn test_unknown_dc_element_is_skipped() {
        let mut metadata = Metadata::default();
        assert!(metadata.start_element(&dc("coverage"), &[]).is_none());
    }

    #[test]
    fn test_epub2_meta_recorded_immediately() {
        let mut metadata = Metadata::default();
        let pending = metadata.start_element(
            &OwnedName::local("meta"),
            &[attr("name", "cover"), attr("content", "cover-img")],
        );
        assert!(pending.is_none());
        assert_eq!(metadata.meta("cover"), Some("cover-img"));
    }

    #[test]
    fn test_modified_meta() {
        let mut metadata = Metadata::default();
        let mut pending = metadata
            .start_element(&OwnedName::local("meta"), &[attr("property", MODIFIED_PROPERTY)])
            .unwrap();
        pending.text.push_str("2020-01-02T03:04:05Z");
        metadata.finish(pending);

        assert_eq!(metadata.modified.as_deref(), Some("2020-01-02T03:04:05Z"));
        let modified = metadata.modified_at().unwrap();
        assert_eq!(modified.to_rfc3339(), "2020-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_modified_at_rejects_loose_formats() {
        let metadata = Metadata {
            modified: Some("2020-01-02".to_string()),
            ..Metadata::default()
        };
        assert!(metadata.modified_at().is_none());

        let metadata = Metadata {
            modified: Some("2020-01-02T03:04:05+01:00".to_string()),
            ..Metadata::default()
        };
        assert!(metadata.modified_at().is_none());
    }

    #[test]
    fn test_refining_meta_kept_as_meta() {
        let mut metadata = Metadata::default();
        let mut pending = metadata
            .start_element(
                &OwnedName::local("meta"),
                &[attr("property", "role"), attr("refines", "#creator")],
            )
            .unwrap();
        pending.text.push_str("aut");
        metadata.finish(pending);

        assert_eq!(metadata.metas[0].refines.as_deref(), Some("#creator"));
        assert_eq!(metadata.meta("role"), Some("aut"));
    }
}
