//! Conformance checking.
//!
//! Runs a fixed set of OCF and package-document rules over a publication and
//! collects the outcome into a [`Report`]. Checking never fails; every problem
//! becomes a [`Finding`].

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::Serialize;
use tracing::debug;
use zip::ZipArchive;

use crate::container::{MimetypeStatus, CONTAINER_XML_PATH};
use crate::error::{Error, Result};
use crate::media_type::MediaType;
use crate::package::PackageDocument;
use crate::reader::{read_mimetype, EpubReader};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The publication does not conform.
    Error,
    /// Likely to cause problems in reading systems.
    Warning,
    /// Informational.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// The rule a finding was raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCode {
    /// The file is not a readable ZIP archive.
    ArchiveInvalid,
    /// The mimetype entry is missing, misplaced or has the wrong content.
    MimetypeInvalid,
    /// The mimetype entry is compressed.
    MimetypeCompressed,
    /// `META-INF/container.xml` is missing.
    ContainerMissing,
    /// `META-INF/container.xml` cannot be parsed.
    ContainerInvalid,
    /// A `<rootfile>` has no `full-path`.
    RootfileMissingPath,
    /// The container declares no rootfiles.
    NoRootfiles,
    /// A rootfile points at a missing entry.
    RootfileNotFound,
    /// A package document cannot be parsed.
    PackageInvalid,
    /// The package `version` is not recognised.
    UnknownVersion,
    /// `unique-identifier` does not reference a `dc:identifier`.
    UniqueIdentifierUnresolved,
    /// No `dc:title`.
    MissingTitle,
    /// No `dc:language`.
    MissingLanguage,
    /// No `dcterms:modified` in an EPUB 3 package.
    MissingModified,
    /// `dcterms:modified` is not `CCYY-MM-DDThh:mm:ssZ`.
    InvalidModified,
    /// A manifest item lacks `id`, `href` or `media-type`.
    IncompleteManifestItem,
    /// A manifest id is declared more than once.
    DuplicateManifestId,
    /// A manifest href points at a missing entry.
    ResourceMissing,
    /// Declared media type disagrees with the file extension.
    MediaTypeMismatch,
    /// EPUB 3 package without a navigation document.
    MissingNav,
    /// The spine has no itemrefs.
    EmptySpine,
    /// A spine idref does not match a manifest item.
    SpineIdrefUnresolved,
    /// A spine idref appears more than once.
    DuplicateSpineIdref,
}

impl FindingCode {
    /// The code as a `snake_case` string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArchiveInvalid => "archive_invalid",
            Self::MimetypeInvalid => "mimetype_invalid",
            Self::MimetypeCompressed => "mimetype_compressed",
            Self::ContainerMissing => "container_missing",
            Self::ContainerInvalid => "container_invalid",
            Self::RootfileMissingPath => "rootfile_missing_path",
            Self::NoRootfiles => "no_rootfiles",
            Self::RootfileNotFound => "rootfile_not_found",
            Self::PackageInvalid => "package_invalid",
            Self::UnknownVersion => "unknown_version",
            Self::UniqueIdentifierUnresolved => "unique_identifier_unresolved",
            Self::MissingTitle => "missing_title",
            Self::MissingLanguage => "missing_language",
            Self::MissingModified => "missing_modified",
            Self::InvalidModified => "invalid_modified",
            Self::IncompleteManifestItem => "incomplete_manifest_item",
            Self::DuplicateManifestId => "duplicate_manifest_id",
            Self::ResourceMissing => "resource_missing",
            Self::MediaTypeMismatch => "media_type_mismatch",
            Self::MissingNav => "missing_nav",
            Self::EmptySpine => "empty_spine",
            Self::SpineIdrefUnresolved => "spine_idref_unresolved",
            Self::DuplicateSpineIdref => "duplicate_spine_idref",
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found in a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// How serious it is.
    pub severity: Severity,
    /// Which rule raised it.
    pub code: FindingCode,
    /// Human-readable description.
    pub message: String,
    /// Archive path the finding relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.code)?;
        if let Some(location) = &self.location {
            write!(f, " {location}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// The outcome of a check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Findings in the order they were raised.
    pub findings: Vec<Finding>,
}

impl Report {
    fn push(
        &mut self,
        severity: Severity,
        code: FindingCode,
        location: Option<&str>,
        message: impl Into<String>,
    ) {
        let finding = Finding {
            severity,
            code,
            message: message.into(),
            location: location.map(str::to_string),
        };
        debug!("{finding}");
        self.findings.push(finding);
    }

    /// Findings with [`Severity::Error`].
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::Error)
    }

    /// Findings with [`Severity::Warning`].
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::Warning)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// Whether any finding has the given code.
    #[must_use]
    pub fn has(&self, code: FindingCode) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    /// True when there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// One-line summary, e.g. `2 errors, 1 warning`.
    #[must_use]
    pub fn summary(&self) -> String {
        let errors = self.errors().count();
        let warnings = self.warnings().count();
        format!(
            "{errors} error{}, {warnings} warning{}",
            if errors == 1 { "" } else { "s" },
            if warnings == 1 { "" } else { "s" }
        )
    }
}

/// Options that change how strictly rules are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Report media-type mismatches as errors instead of warnings.
    pub strict_media_types: bool,
    /// Report a compressed mimetype entry as an error instead of a warning.
    pub require_stored_mimetype: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            strict_media_types: false,
            require_stored_mimetype: true,
        }
    }
}

/// Open and check a publication on disk.
#[must_use]
pub fn check_file(path: impl AsRef<Path>, options: &CheckOptions) -> Report {
    let path = path.as_ref();
    match File::open(path) {
        Ok(file) => check_reader(BufReader::new(file), options),
        Err(source) => {
            let mut report = Report::default();
            open_failure(
                &Error::Open {
                    path: path.to_path_buf(),
                    source,
                },
                &mut report,
            );
            report
        }
    }
}

/// Open and check a publication from a seekable reader.
///
/// The mimetype rule runs on the raw archive, so it is reported even when
/// the container cannot be read.
#[must_use]
pub fn check_reader<R: Read + Seek>(source: R, options: &CheckOptions) -> Report {
    let mut report = Report::default();
    let mut archive = match ZipArchive::new(source) {
        Ok(archive) => archive,
        Err(err) => {
            open_failure(&Error::Zip(err), &mut report);
            return report;
        }
    };

    check_mimetype(read_mimetype(&mut archive), options, &mut report);
    match EpubReader::from_archive(archive) {
        Ok(mut reader) => check_opened(&mut reader, options, &mut report),
        Err(err) => open_failure(&err, &mut report),
    }

    debug!("Check finished: {}", report.summary());
    report
}

/// Check an opened publication.
pub fn check<R: Read + Seek>(reader: &mut EpubReader<R>, options: &CheckOptions) -> Report {
    let mut report = Report::default();

    check_mimetype(reader.check_mimetype(), options, &mut report);
    check_opened(reader, options, &mut report);

    debug!("Check finished: {}", report.summary());
    report
}

fn check_opened<R: Read + Seek>(
    reader: &mut EpubReader<R>,
    options: &CheckOptions,
    report: &mut Report,
) {
    check_container(reader, report);

    let names: HashSet<String> = reader.file_names().map(str::to_string).collect();
    for package in reader.package_documents() {
        check_package(package, &names, options, report);
    }
}

fn open_failure(err: &Error, report: &mut Report) {
    let (code, location) = match err {
        Error::EntryNotFound { name } if name == CONTAINER_XML_PATH => {
            (FindingCode::ContainerMissing, Some(CONTAINER_XML_PATH))
        }
        Error::Xml(_) | Error::Container { .. } => {
            (FindingCode::ContainerInvalid, Some(CONTAINER_XML_PATH))
        }
        _ => (FindingCode::ArchiveInvalid, None),
    };
    report.push(Severity::Error, code, location, err.to_string());
}

fn check_mimetype(status: Result<MimetypeStatus>, options: &CheckOptions, report: &mut Report) {
    match status {
        Ok(status) if !status.stored => {
            let severity = if options.require_stored_mimetype {
                Severity::Error
            } else {
                Severity::Warning
            };
            report.push(
                severity,
                FindingCode::MimetypeCompressed,
                Some("mimetype"),
                "The mimetype entry must be stored without compression",
            );
        }
        Ok(_) => {}
        Err(err) => report.push(
            Severity::Error,
            FindingCode::MimetypeInvalid,
            Some("mimetype"),
            err.to_string(),
        ),
    }
}

fn check_container<R: Read + Seek>(reader: &mut EpubReader<R>, report: &mut Report) {
    let location = Some(CONTAINER_XML_PATH);
    match reader.check_container_xml() {
        Ok(_) => {}
        Err(err @ Error::Container { .. }) => report.push(
            Severity::Error,
            FindingCode::RootfileMissingPath,
            location,
            err.to_string(),
        ),
        Err(err) => report.push(
            Severity::Error,
            FindingCode::ContainerInvalid,
            location,
            err.to_string(),
        ),
    }

    if reader.rootfiles().is_empty() {
        report.push(
            Severity::Error,
            FindingCode::NoRootfiles,
            location,
            "The container declares no package document",
        );
    }

    for rootfile in reader.rootfiles() {
        let path = rootfile.full_path.as_str();
        if !reader.contains(path) {
            report.push(
                Severity::Error,
                FindingCode::RootfileNotFound,
                Some(path),
                "Package document declared in container.xml is missing from the archive",
            );
        }
    }

    for failure in reader.load_failures() {
        if reader.contains(&failure.path) {
            report.push(
                Severity::Error,
                FindingCode::PackageInvalid,
                Some(failure.path.as_str()),
                failure.message.clone(),
            );
        }
    }
}

fn check_package(
    package: &PackageDocument,
    names: &HashSet<String>,
    options: &CheckOptions,
    report: &mut Report,
) {
    let location = Some(package.path.as_str());

    if !matches!(package.version.as_str(), "2.0" | "3.0") {
        report.push(
            Severity::Warning,
            FindingCode::UnknownVersion,
            location,
            format!("Unrecognised package version {:?}", package.version),
        );
    }

    if package.unique_identifier_value().is_none() {
        report.push(
            Severity::Error,
            FindingCode::UniqueIdentifierUnresolved,
            location,
            format!(
                "unique-identifier {:?} does not match any dc:identifier id",
                package.unique_identifier
            ),
        );
    }

    if package.metadata.titles.is_empty() {
        report.push(
            Severity::Error,
            FindingCode::MissingTitle,
            location,
            "Metadata has no dc:title",
        );
    }

    if package.metadata.languages.is_empty() {
        report.push(
            Severity::Error,
            FindingCode::MissingLanguage,
            location,
            "Metadata has no dc:language",
        );
    }

    if package.is_epub3() {
        match &package.metadata.modified {
            None => report.push(
                Severity::Error,
                FindingCode::MissingModified,
                location,
                "EPUB 3 metadata must include dcterms:modified",
            ),
            Some(modified) if package.metadata.modified_at().is_none() => report.push(
                Severity::Error,
                FindingCode::InvalidModified,
                location,
                format!("dcterms:modified {modified:?} is not of the form CCYY-MM-DDThh:mm:ssZ"),
            ),
            Some(_) => {}
        }
    }

    check_manifest(package, names, options, report);
    check_spine(package, report);
}

fn check_manifest(
    package: &PackageDocument,
    names: &HashSet<String>,
    options: &CheckOptions,
    report: &mut Report,
) {
    for id in package.manifest.duplicate_ids() {
        report.push(
            Severity::Error,
            FindingCode::DuplicateManifestId,
            Some(package.path.as_str()),
            format!("Manifest id {id:?} is declared more than once"),
        );
    }

    for item in &package.manifest {
        if item.id.is_empty() || item.href.is_empty() || item.media_type.is_empty() {
            report.push(
                Severity::Error,
                FindingCode::IncompleteManifestItem,
                Some(package.path.as_str()),
                format!(
                    "Manifest item (id {:?}, href {:?}) must have id, href and media-type",
                    item.id, item.href
                ),
            );
            continue;
        }
        if item.is_remote() {
            continue;
        }

        let path = package.resolve_href(&item.href);
        if !names.contains(&path) {
            report.push(
                Severity::Error,
                FindingCode::ResourceMissing,
                Some(path.as_str()),
                format!("Manifest item {:?} refers to a missing resource", item.id),
            );
        }

        let by_extension = MediaType::try_from(Path::new(&path)).ok();
        if let (Some(declared), Some(expected)) = (item.core_media_type(), by_extension) {
            if declared != expected {
                let severity = if options.strict_media_types {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                report.push(
                    severity,
                    FindingCode::MediaTypeMismatch,
                    Some(path.as_str()),
                    format!("Declared media type {declared} but the extension suggests {expected}"),
                );
            }
        }
    }

    if package.is_epub3() && package.manifest.nav().is_none() {
        report.push(
            Severity::Error,
            FindingCode::MissingNav,
            Some(package.path.as_str()),
            "EPUB 3 manifest has no item with the nav property",
        );
    }
}

fn check_spine(package: &PackageDocument, report: &mut Report) {
    let location = Some(package.path.as_str());
    let spine = &package.spine;

    if spine.itemrefs.is_empty() {
        report.push(
            Severity::Error,
            FindingCode::EmptySpine,
            location,
            "The spine has no itemref",
        );
    }

    for itemref in &spine.itemrefs {
        if package.manifest.get(&itemref.idref).is_none() {
            report.push(
                Severity::Error,
                FindingCode::SpineIdrefUnresolved,
                location,
                format!("Spine idref {:?} does not match a manifest item", itemref.idref),
            );
        }
    }

    for idref in spine.duplicate_idrefs() {
        report.push(
            Severity::Warning,
            FindingCode::DuplicateSpineIdref,
            location,
            format!("Spine idref {idref:?} appears more than once"),
        );
    }
}
