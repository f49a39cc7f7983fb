//! High-level [`MixArchive`] API: open a container file, list its records
//! with names resolved through a [`MixDatabase`], pull entries out by name
//! or id.
//!
//! ```no_run
//! use mixread::archive::MixArchive;
//! use mixread::database::{MixDatabase, StringFraming};
//!
//! let db = MixDatabase::load_file("global mix database.dat", StringFraming::default())?;
//! let mut ar = MixArchive::open("conquer.mix")?;
//! for entry in ar.list(&db) {
//!     println!("{:08x} {:>10} {}", entry.file_id, entry.size, entry.name.as_deref().unwrap_or("<unknown>"));
//! }
//! let rules = ar.read_file("rules.ini")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::crypto::PublicKey;
use crate::database::MixDatabase;
use crate::hash::file_id;
use crate::header::{HeaderRecord, MixHeader};
use crate::io_stream::{DecodedHeader, Layout, MixError, MixReader};

// ── EntryInfo ─────────────────────────────────────────────────────────────────

/// One header record plus its resolved database description, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub file_id: u32,
    pub offset:  u32,
    pub size:    u32,
    pub name:    Option<String>,
}

impl EntryInfo {
    pub fn resolve(record: &HeaderRecord, db: &MixDatabase) -> Self {
        Self {
            file_id: record.file_id,
            offset:  record.offset,
            size:    record.size,
            name:    db.describe(record.file_id),
        }
    }
}

// ── MixArchive ────────────────────────────────────────────────────────────────

pub struct MixArchive {
    path:   PathBuf,
    reader: MixReader<BufReader<File>>,
}

impl MixArchive {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MixError> {
        Self::open_with_key(path, &PublicKey::westwood())
    }

    pub fn open_with_key<P: AsRef<Path>>(path: P, key: &PublicKey) -> Result<Self, MixError> {
        let path   = path.as_ref().to_owned();
        let reader = MixReader::with_key(BufReader::new(File::open(&path)?), key)?;
        Ok(Self { path, reader })
    }

    // ── Read ──────────────────────────────────────────────────────────────────

    pub fn list(&self, db: &MixDatabase) -> Vec<EntryInfo> {
        self.header()
            .records
            .iter()
            .map(|r| EntryInfo::resolve(r, db))
            .collect()
    }

    /// Find a record by file name (hashed, case-insensitive).
    pub fn stat(&self, name: &str) -> Option<HeaderRecord> {
        self.header().find(file_id(name)).copied()
    }

    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>, MixError> {
        self.read_file_by_id(file_id(name))
    }

    pub fn read_file_by_id(&mut self, id: u32) -> Result<Vec<u8>, MixError> {
        self.reader.read_entry(id)
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn path(&self) -> &Path { &self.path }

    pub fn decoded(&self) -> &DecodedHeader { &self.reader.decoded }

    pub fn header(&self) -> &MixHeader { self.reader.header() }

    pub fn layout(&self) -> Layout { self.reader.decoded.layout }
}
