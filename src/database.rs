//! Name database: `(file name, comment)` pairs keyed by [`file_id`].
//!
//! Layout: one leading `u32` (format marker, ignored), then string pairs
//! until the source runs out.
//!
//! Loading stops silently at the first string that cannot be read.  A
//! truncated or corrupt tail is therefore indistinguishable from a normal
//! end; the entries read so far are kept.  This matches how the legacy
//! tools consume the file and is deliberate.

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

use crate::hash::file_id;

/// Where the CLI looks for the database when no path is given.
pub const DEFAULT_DATABASE_PATH: &str = "global mix database.dat";

/// How each string in the database is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringFraming {
    /// Bytes up to a terminating NUL.
    #[default]
    NulTerminated,
    /// `u32` little-endian byte length, then the bytes.
    LengthPrefixed,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database is missing its leading marker")]
    Truncated,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseEntry {
    pub file_name: String,
    pub comment:   String,
}

impl DatabaseEntry {
    pub fn id(&self) -> u32 {
        file_id(&self.file_name)
    }

    /// `"<file name> <comment>"`, the form shown next to header records.
    pub fn describe(&self) -> String {
        format!("{} {}", self.file_name, self.comment)
    }
}

/// Read-only after loading; share it by reference across decodes.
#[derive(Debug, Clone, Default)]
pub struct MixDatabase {
    entries: HashMap<u32, DatabaseEntry>,
}

impl MixDatabase {
    pub fn load<R: Read>(mut reader: R, framing: StringFraming) -> Result<Self, DatabaseError> {
        reader.read_u32::<LittleEndian>().map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => DatabaseError::Truncated,
            _                            => DatabaseError::Io(e),
        })?;

        let mut db    = Self::default();
        let mut count = 0usize;
        loop {
            let file_name = match read_string(&mut reader, framing) {
                Ok(s)  => s,
                Err(e) => {
                    debug!("database ended after {count} entries ({e})");
                    break;
                }
            };
            let comment = match read_string(&mut reader, framing) {
                Ok(s)  => s,
                Err(e) => {
                    warn!("database ended inside entry {file_name:?} after {count} entries ({e})");
                    break;
                }
            };
            db.insert(DatabaseEntry { file_name, comment });
            count += 1;
        }
        debug!("loaded {} distinct ids from {count} entries", db.len());
        Ok(db)
    }

    pub fn load_file<P: AsRef<Path>>(path: P, framing: StringFraming) -> Result<Self, DatabaseError> {
        Self::load(BufReader::new(File::open(path)?), framing)
    }

    /// Insert under the entry's id, replacing (and returning) any previous
    /// entry with the same id.
    pub fn insert(&mut self, entry: DatabaseEntry) -> Option<DatabaseEntry> {
        self.entries.insert(entry.id(), entry)
    }

    pub fn lookup(&self, id: u32) -> Option<&DatabaseEntry> {
        self.entries.get(&id)
    }

    pub fn describe(&self, id: u32) -> Option<String> {
        self.lookup(id).map(DatabaseEntry::describe)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_string<R: Read>(reader: &mut R, framing: StringFraming) -> io::Result<String> {
    let mut bytes = Vec::new();
    match framing {
        StringFraming::NulTerminated => loop {
            match reader.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        },
        StringFraming::LengthPrefixed => {
            let len = reader.read_u32::<LittleEndian>()? as u64;
            reader.by_ref().take(len).read_to_end(&mut bytes)?;
            if (bytes.len() as u64) != len {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short database string"));
            }
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
