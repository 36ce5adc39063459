//! EPUB fixtures for unit tests.

use std::io::Cursor;

use crate::reader::EpubReader;

#[path = "../tests/common/mod.rs"]
mod common;

pub(crate) use common::*;

impl EpubBuilder {
    /// Serialize the archive and open it.
    pub(crate) fn open(self) -> EpubReader<Cursor<Vec<u8>>> {
        EpubReader::from_reader(Cursor::new(self.build())).unwrap()
    }
}
