//! Reading EPUB publications.
//!
//! [`EpubReader`] opens the ZIP container, locates the package documents
//! through `META-INF/container.xml` and gives access to archive entries and
//! manifest resources.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::{CompressionMethod, ZipArchive};

use crate::container::{
    check_mimetype_entry, Container, MimetypeStatus, Rootfile, CONTAINER_XML_PATH,
};
use crate::error::{Error, Result};
use crate::package::{ManifestItem, PackageDocument, SpineItem};

/// The mimetype entry is never legitimately longer than this.
const MIMETYPE_READ_LIMIT: u64 = 64;

/// Upper bound on the buffer reserved up front for an entry.
const PREALLOCATE_LIMIT: u64 = 1024 * 1024;

/// A package document that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    /// Rootfile path of the package document.
    pub path: String,
    /// Why loading failed.
    pub message: String,
}

/// Summary of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    /// Entry name (archive path).
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Compressed size in bytes.
    pub compressed_size: u64,
    /// Whether the entry is stored without compression.
    pub stored: bool,
}

/// A reader over an EPUB publication.
#[derive(Debug)]
pub struct EpubReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    rootfiles: Vec<Rootfile>,
    package_documents: Vec<PackageDocument>,
    load_failures: Vec<LoadFailure>,
}

impl EpubReader<BufReader<File>> {
    /// Open a publication from the file system.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not a ZIP archive,
    /// or has no readable `META-INF/container.xml`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening publication at {}", path.display());
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> EpubReader<R> {
    /// Open a publication from any seekable reader.
    ///
    /// Package documents that are missing or fail to parse are skipped and
    /// recorded in [`EpubReader::load_failures`].
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a ZIP archive or has no readable
    /// `META-INF/container.xml`.
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::from_archive(ZipArchive::new(reader)?)
    }

    /// Open a publication from an already opened ZIP archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive has no readable
    /// `META-INF/container.xml`.
    pub fn from_archive(mut archive: ZipArchive<R>) -> Result<Self> {
        let container = {
            let entry = archive
                .by_name(CONTAINER_XML_PATH)
                .map_err(|e| entry_error(e, CONTAINER_XML_PATH))?;
            Container::parse(BufReader::new(entry))?
        };
        if container.invalid_rootfiles > 0 {
            warn!(
                "Ignoring {} <rootfile> element(s) without full-path",
                container.invalid_rootfiles
            );
        }

        let mut package_documents = Vec::new();
        let mut load_failures = Vec::new();
        for rootfile in &container.rootfiles {
            let path = rootfile.full_path.as_str();
            let parsed = archive
                .by_name(path)
                .map_err(|e| entry_error(e, path))
                .and_then(|entry| PackageDocument::parse(path, BufReader::new(entry)));
            match parsed {
                Ok(package) => package_documents.push(package),
                Err(err) => {
                    warn!("Skipping package document {path}: {err}");
                    load_failures.push(LoadFailure {
                        path: path.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        debug!(
            "Loaded {} of {} package document(s) from {} entries",
            package_documents.len(),
            container.rootfiles.len(),
            archive.len()
        );

        Ok(Self {
            archive,
            rootfiles: container.rootfiles,
            package_documents,
            load_failures,
        })
    }

    /// The default rendition's package document.
    #[must_use]
    pub fn package_document(&self) -> Option<&PackageDocument> {
        self.package_documents.first()
    }

    /// The default rendition's package document, or an error if none loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPackageDocument`] if no package document loaded.
    pub fn require_package_document(&self) -> Result<&PackageDocument> {
        self.package_document().ok_or(Error::NoPackageDocument)
    }

    /// All successfully loaded package documents, in container order.
    #[must_use]
    pub fn package_documents(&self) -> &[PackageDocument] {
        &self.package_documents
    }

    /// Rootfiles declared by the container document.
    #[must_use]
    pub fn rootfiles(&self) -> &[Rootfile] {
        &self.rootfiles
    }

    /// Archive paths of the declared package documents.
    #[must_use]
    pub fn package_document_paths(&self) -> Vec<&str> {
        self.rootfiles
            .iter()
            .map(|rootfile| rootfile.full_path.as_str())
            .collect()
    }

    /// Package documents that were declared but could not be loaded.
    #[must_use]
    pub fn load_failures(&self) -> &[LoadFailure] {
        &self.load_failures
    }

    /// Verify the OCF mimetype entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mimetype`] if the first entry is not `mimetype` or
    /// its content is not `application/epub+zip`.
    pub fn check_mimetype(&mut self) -> Result<MimetypeStatus> {
        read_mimetype(&mut self.archive)
    }

    /// Parse the container document strictly.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is missing, malformed, or declares a
    /// `<rootfile>` without `full-path`.
    pub fn check_container_xml(&mut self) -> Result<Vec<Rootfile>> {
        let entry = self
            .archive
            .by_name(CONTAINER_XML_PATH)
            .map_err(|e| entry_error(e, CONTAINER_XML_PATH))?;
        Container::parse(BufReader::new(entry))?.into_rootfiles()
    }

    /// Names of all archive entries.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    /// Number of archive entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Whether the archive contains an entry with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Describe every archive entry, in archive order.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry header cannot be read.
    pub fn entries(&mut self) -> Result<Vec<EntryInfo>> {
        (0..self.archive.len())
            .map(|index| {
                let entry = self.archive.by_index_raw(index)?;
                Ok(EntryInfo {
                    name: entry.name().to_string(),
                    size: entry.size(),
                    compressed_size: entry.compressed_size(),
                    stored: entry.compression() == CompressionMethod::Stored,
                })
            })
            .collect()
    }

    /// Read a whole entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] if there is no such entry, or an
    /// error if decompression fails.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        self.read_entry_limited(name, u64::MAX)
    }

    /// Read a whole entry, refusing entries larger than `limit` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryTooLarge`] if the entry exceeds `limit`, plus
    /// the errors of [`EpubReader::read_entry`].
    pub fn read_entry_limited(&mut self, name: &str, limit: u64) -> Result<Vec<u8>> {
        let mut entry = self.archive.by_name(name).map_err(|e| entry_error(e, name))?;
        let size = entry.size();
        let too_large = |size| Error::EntryTooLarge {
            name: name.to_string(),
            size,
            limit,
        };
        if size > limit {
            return Err(too_large(size));
        }

        let mut content = Vec::with_capacity(initial_capacity(size, limit));
        entry
            .by_ref()
            .take(limit.saturating_add(1))
            .read_to_end(&mut content)?;
        let read = content.len() as u64;
        if read > limit {
            return Err(too_large(read));
        }

        debug!("Read {read} bytes from {name}");
        Ok(content)
    }

    /// Read an entry as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotUtf8`] if the content is not UTF-8, plus the
    /// errors of [`EpubReader::read_entry`].
    pub fn read_entry_to_string(&mut self, name: &str) -> Result<String> {
        let content = self.read_entry(name)?;
        String::from_utf8(content).map_err(|_| Error::EntryNotUtf8 {
            name: name.to_string(),
        })
    }

    /// Archive path of a manifest item of the default rendition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPackageDocument`] or
    /// [`Error::ManifestItemNotFound`].
    pub fn manifest_item_path(&self, id: &str) -> Result<String> {
        let package = self.require_package_document()?;
        let item = package
            .manifest
            .get(id)
            .ok_or_else(|| Error::ManifestItemNotFound { id: id.to_string() })?;
        Ok(package.resolve_href(&item.href))
    }

    /// Read a manifest item of the default rendition by id.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EpubReader::manifest_item_path`] and
    /// [`EpubReader::read_entry`].
    pub fn read_manifest_item(&mut self, id: &str) -> Result<Vec<u8>> {
        let path = self.manifest_item_path(id)?;
        self.read_entry(&path)
    }

    /// Spine items of the default rendition paired with their manifest items,
    /// in reading order. Unresolvable idrefs are skipped.
    pub fn spine_documents(&self) -> impl Iterator<Item = (&SpineItem, &ManifestItem)> {
        self.package_document().into_iter().flat_map(|package| {
            package.spine.itemrefs.iter().filter_map(move |itemref| {
                package
                    .manifest
                    .get(&itemref.idref)
                    .map(|item| (itemref, item))
            })
        })
    }

    /// The underlying ZIP archive.
    #[must_use]
    pub fn archive(&self) -> &ZipArchive<R> {
        &self.archive
    }

    /// Consume the reader, returning the underlying ZIP archive.
    #[must_use]
    pub fn into_archive(self) -> ZipArchive<R> {
        self.archive
    }
}

/// Verify the OCF mimetype entry of a raw archive.
///
/// # Errors
///
/// Returns [`Error::Mimetype`] if the first entry is not `mimetype` or its
/// content is not `application/epub+zip`.
pub fn read_mimetype<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<MimetypeStatus> {
    if archive.is_empty() {
        return Err(Error::mimetype("The mimetype not found"));
    }

    let mut entry = archive.by_index(0)?;
    let name = entry.name().to_string();
    let stored = entry.compression() == CompressionMethod::Stored;

    let mut content = Vec::new();
    entry
        .by_ref()
        .take(MIMETYPE_READ_LIMIT)
        .read_to_end(&mut content)?;

    check_mimetype_entry(&name, &content, stored)
}

/// Buffer size to reserve for an entry whose header claims `size` bytes.
///
/// Headers are untrusted, so the reservation is capped and the buffer grows
/// while reading.
fn initial_capacity(size: u64, limit: u64) -> usize {
    usize::try_from(size.min(limit).min(PREALLOCATE_LIMIT)).unwrap_or_default()
}

fn entry_error(err: ZipError, name: &str) -> Error {
    match err {
        ZipError::FileNotFound => Error::EntryNotFound {
            name: name.to_string(),
        },
        other => Error::Zip(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{MIMETYPE_CONTENT, MIMETYPE_PATH};
    use crate::testing::{opf, EpubBuilder, CHAPTER, CONTAINER_XML, MANIFEST, OPF_PATH, SPINE};
    use std::io::Cursor;

    #[test]
    fn test_open_minimal() {
        let reader = EpubBuilder::minimal().open();
        assert_eq!(reader.package_documents().len(), 1);
        assert_eq!(reader.package_document_paths(), vec![OPF_PATH]);
        assert!(reader.load_failures().is_empty());

        let package = reader.package_document().unwrap();
        assert_eq!(package.version, "3.0");
        assert_eq!(package.metadata.title(), Some("Test Book"));
    }

    #[test]
    fn test_open_not_a_zip() {
        let result = EpubReader::from_reader(Cursor::new(b"not a zip".to_vec()));
        assert!(matches!(result, Err(Error::Zip(_))));
    }

    #[test]
    fn test_open_without_container() {
        let data = EpubBuilder::minimal().without(CONTAINER_XML_PATH).build();
        let err = EpubReader::from_reader(Cursor::new(data)).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains(CONTAINER_XML_PATH));
    }

    #[test]
    fn test_open_missing_package_is_skipped() {
        let reader = EpubBuilder::minimal().without(OPF_PATH).open();
        assert!(reader.package_document().is_none());
        assert_eq!(reader.load_failures().len(), 1);
        assert_eq!(reader.load_failures()[0].path, OPF_PATH);
        assert!(matches!(
            reader.require_package_document(),
            Err(Error::NoPackageDocument)
        ));
    }

    #[test]
    fn test_open_skips_invalid_package_but_keeps_others() {
        let container = r#"<container><rootfiles>
            <rootfile full-path="broken.opf"/>
            <rootfile full-path="OEBPS/content.opf"/>
        </rootfiles></container>"#;
        let reader = EpubBuilder::minimal()
            .entry(CONTAINER_XML_PATH, container)
            .entry("broken.opf", r#"<package version="3.0"/>"#)
            .open();

        assert_eq!(reader.package_documents().len(), 1);
        assert_eq!(reader.package_document().unwrap().path, OPF_PATH);
        assert!(reader.load_failures()[0]
            .message
            .contains("unique-identifier"));
    }

    #[test]
    fn test_check_mimetype_ok() {
        let mut reader = EpubBuilder::minimal().open();
        let status = reader.check_mimetype().unwrap();
        assert!(status.stored);
    }

    #[test]
    fn test_check_mimetype_compressed() {
        let mut reader = EpubBuilder::minimal()
            .entry(MIMETYPE_PATH, MIMETYPE_CONTENT)
            .open();
        let status = reader.check_mimetype().unwrap();
        assert!(!status.stored);
    }

    #[test]
    fn test_check_mimetype_not_first() {
        let mut reader = EpubBuilder::new()
            .entry(CONTAINER_XML_PATH, CONTAINER_XML)
            .stored(MIMETYPE_PATH, MIMETYPE_CONTENT)
            .entry(OPF_PATH, opf(MANIFEST, SPINE))
            .open();
        assert!(matches!(
            reader.check_mimetype(),
            Err(Error::Mimetype { .. })
        ));
    }

    #[test]
    fn test_check_mimetype_wrong_content() {
        let mut reader = EpubBuilder::minimal()
            .stored(MIMETYPE_PATH, "application/zip")
            .open();
        let err = reader.check_mimetype().unwrap_err();
        assert!(err.to_string().contains("application/zip"));
    }

    #[test]
    fn test_check_container_xml_strict() {
        let container = r#"<container><rootfiles>
            <rootfile full-path="OEBPS/content.opf"/>
            <rootfile/>
        </rootfiles></container>"#;
        let mut reader = EpubBuilder::minimal()
            .entry(CONTAINER_XML_PATH, container)
            .open();

        assert_eq!(reader.rootfiles().len(), 1);
        assert!(matches!(
            reader.check_container_xml(),
            Err(Error::Container { .. })
        ));
    }

    #[test]
    fn test_file_names_and_contains() {
        let reader = EpubBuilder::minimal().open();
        assert_eq!(reader.len(), 6);
        assert!(!reader.is_empty());
        assert!(reader.contains("OEBPS/style.css"));
        assert!(!reader.contains("OEBPS/missing.css"));
        assert!(reader.file_names().any(|n| n == MIMETYPE_PATH));
    }

    #[test]
    fn test_entries() {
        let mut reader = EpubBuilder::minimal().open();
        let entries = reader.entries().unwrap();
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].name, MIMETYPE_PATH);
        assert!(entries[0].stored);
        assert_eq!(entries[0].size, MIMETYPE_CONTENT.len() as u64);
        assert!(!entries[1].stored);
    }

    #[test]
    fn test_read_entry() {
        let mut reader = EpubBuilder::minimal().open();
        let content = reader.read_entry_to_string("OEBPS/text/c1.xhtml").unwrap();
        assert_eq!(content, CHAPTER);
    }

    #[test]
    fn test_initial_capacity_ignores_oversized_headers() {
        assert_eq!(initial_capacity(15, u64::MAX), 15);
        assert_eq!(initial_capacity(0xFFFF_FFF0, u64::MAX), 1024 * 1024);
        assert_eq!(initial_capacity(u64::MAX, 100), 100);
    }

    #[test]
    fn test_read_entry_larger_than_preallocation() {
        let big = vec![b'a'; 3 * 1024 * 1024];
        let mut reader = EpubBuilder::minimal().entry("OEBPS/big.txt", &big).open();
        assert_eq!(reader.read_entry("OEBPS/big.txt").unwrap().len(), big.len());
    }

    #[test]
    fn test_read_mimetype_without_container() {
        let data = EpubBuilder::minimal()
            .stored(MIMETYPE_PATH, "application/zip")
            .without(CONTAINER_XML_PATH)
            .build();
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            read_mimetype(&mut archive),
            Err(Error::Mimetype { .. })
        ));
    }

    #[test]
    fn test_read_entry_not_found() {
        let mut reader = EpubBuilder::minimal().open();
        let err = reader.read_entry("nope.xhtml").unwrap_err();
        assert!(matches!(err, Error::EntryNotFound { ref name } if name == "nope.xhtml"));
    }

    #[test]
    fn test_read_entry_limited() {
        let mut reader = EpubBuilder::minimal().open();
        let err = reader
            .read_entry_limited("OEBPS/text/c1.xhtml", 10)
            .unwrap_err();
        assert!(matches!(err, Error::EntryTooLarge { limit: 10, .. }));

        let content = reader
            .read_entry_limited("OEBPS/style.css", 1024)
            .unwrap();
        assert_eq!(content, b"p { margin: 0 }");
    }

    #[test]
    fn test_read_entry_to_string_rejects_binary() {
        let mut reader = EpubBuilder::minimal()
            .entry("OEBPS/images/x.png", [0x89, 0x50, 0xff, 0xfe])
            .open();
        let err = reader.read_entry_to_string("OEBPS/images/x.png").unwrap_err();
        assert!(matches!(err, Error::EntryNotUtf8 { .. }));
    }

    #[test]
    fn test_read_manifest_item() {
        let mut reader = EpubBuilder::minimal().open();
        assert_eq!(reader.manifest_item_path("c1").unwrap(), "OEBPS/text/c1.xhtml");
        let content = reader.read_manifest_item("css").unwrap();
        assert_eq!(content, b"p { margin: 0 }");

        let err = reader.read_manifest_item("missing").unwrap_err();
        assert!(matches!(err, Error::ManifestItemNotFound { .. }));
    }

    #[test]
    fn test_spine_documents_skip_unresolved() {
        let spine = r#"<itemref idref="c1"/><itemref idref="ghost"/><itemref idref="nav" linear="no"/>"#;
        let reader = EpubBuilder::minimal()
            .entry(OPF_PATH, opf(MANIFEST, spine))
            .open();

        let order: Vec<&str> = reader
            .spine_documents()
            .map(|(_, item)| item.href.as_str())
            .collect();
        assert_eq!(order, vec!["text/c1.xhtml", "nav.xhtml"]);
    }

    #[test]
    fn test_archive_access() {
        let reader = EpubBuilder::minimal().open();
        assert_eq!(reader.archive().len(), 6);
        assert_eq!(reader.into_archive().len(), 6);
    }
}
