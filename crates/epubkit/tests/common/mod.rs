//! EPUB fixtures shared by unit, binary and integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const MIMETYPE: &str = "application/epub+zip";

pub const CONTAINER_XML_PATH: &str = "META-INF/container.xml";

pub const OPF_PATH: &str = "OEBPS/content.opf";

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const MANIFEST: &str = r#"
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="c1" href="text/c1.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>"#;

pub const SPINE: &str = r#"<itemref idref="c1"/>"#;

pub const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>One</title></head><body><p>Chapter one.</p></body></html>"#;

pub const STYLESHEET: &str = "p { margin: 0 }";

/// Build an EPUB 3 package document around the given manifest and spine
/// bodies.
pub fn opf(manifest: &str, spine: &str) -> String {
    opf_titled("Test Book", manifest, spine)
}

/// Like [`opf`] with a custom title.
pub fn opf_titled(title: &str, manifest: &str, spine: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid" xml:lang="en">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:12345678-0000-0000-0000-000000000000</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>en</dc:language>
    <dc:creator>A. Author</dc:creator>
    <meta property="dcterms:modified">2024-01-01T00:00:00Z</meta>
  </metadata>
  <manifest>{manifest}
  </manifest>
  <spine>{spine}</spine>
</package>"#
    )
}

#[derive(Debug)]
struct Entry {
    name: String,
    content: Vec<u8>,
    method: CompressionMethod,
}

/// Builder for EPUB archives.
#[derive(Debug, Default)]
pub struct EpubBuilder {
    entries: Vec<Entry>,
}

impl EpubBuilder {
    /// An empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// A small valid EPUB 3 publication.
    pub fn minimal() -> Self {
        Self::new()
            .stored("mimetype", MIMETYPE)
            .entry(CONTAINER_XML_PATH, CONTAINER_XML)
            .entry(OPF_PATH, opf(MANIFEST, SPINE))
            .entry("OEBPS/nav.xhtml", CHAPTER)
            .entry("OEBPS/text/c1.xhtml", CHAPTER)
            .entry("OEBPS/style.css", STYLESHEET)
    }

    /// Add (or replace) a deflated entry.
    pub fn entry(self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.add(name, content.as_ref(), CompressionMethod::Deflated)
    }

    /// Add (or replace) a stored entry.
    pub fn stored(self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.add(name, content.as_ref(), CompressionMethod::Stored)
    }

    /// Remove an entry.
    pub fn without(mut self, name: &str) -> Self {
        self.entries.retain(|e| e.name != name);
        self
    }

    fn add(mut self, name: &str, content: &[u8], method: CompressionMethod) -> Self {
        let entry = Entry {
            name: name.to_string(),
            content: content.to_vec(),
            method,
        };
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    /// Serialize the archive.
    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in self.entries {
            let options = SimpleFileOptions::default().compression_method(entry.method);
            writer.start_file(entry.name, options).unwrap();
            writer.write_all(&entry.content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Serialize the archive into a temporary file.
    pub fn write(self) -> Fixture {
        Fixture::from_bytes(&self.build())
    }
}

/// An EPUB file in a temporary directory, removed on drop.
#[derive(Debug)]
pub struct Fixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    /// Write `bytes` as `book.epub` in a fresh temporary directory.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, bytes).unwrap();
        Self { _dir: dir, path }
    }

    /// The minimal publication on disk.
    pub fn minimal() -> Self {
        EpubBuilder::minimal().write()
    }
}
