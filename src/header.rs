//! On-disk MIX header structures and their schemas.
//!
//! ```text
//! legacy:     num_files u16 | data_size u32 | records[num_files]
//! modern:     0u16 | flags (2 B) | [key_block1 40 B | key_block2 40 B] | header
//! record:     file_id u32 | offset u32 | size u32
//! ```
//!
//! All integers are little-endian.  The flags word packs its subfields from
//! the most-significant bit of each byte: on disk the encryption bit is
//! `0x02` and the checksum bit is `0x01` of the byte after the zero marker.

use serde::Serialize;
use std::io::Read;

use crate::crypto::KEY_BLOCK_LEN;
use crate::schema::{self, BitOrder, SchemaError, SchemaNode, Value};

/// Byte length of one [`HeaderRecord`] on disk.
pub const RECORD_SIZE: usize = 12;

// ── Schemas ──────────────────────────────────────────────────────────────────

pub fn flags_schema() -> SchemaNode {
    SchemaNode::bitfield(BitOrder::MsbFirst, &[
        ("reserved",       6),
        ("has_encryption", 1),
        ("has_checksum",   1),
        ("reserved2",      8),
    ])
}

pub fn key_block_schema() -> SchemaNode {
    SchemaNode::structure(vec![
        ("key_block1", SchemaNode::bytes(KEY_BLOCK_LEN)),
        ("key_block2", SchemaNode::bytes(KEY_BLOCK_LEN)),
    ])
}

pub fn record_schema() -> SchemaNode {
    SchemaNode::structure(vec![
        ("file_id", SchemaNode::u32_le()),
        ("offset",  SchemaNode::u32_le()),
        ("size",    SchemaNode::u32_le()),
    ])
}

pub fn header_schema() -> SchemaNode {
    SchemaNode::structure(vec![
        ("num_files", SchemaNode::u16_le()),
        ("data_size", SchemaNode::u32_le()),
        ("records",   SchemaNode::list("num_files", record_schema())),
    ])
}

// ── HeaderFlags ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HeaderFlags {
    pub reserved:       u8,
    pub has_encryption: bool,
    /// Parsed only; checksum verification is not performed.
    pub has_checksum:   bool,
    pub reserved2:      u8,
}

impl HeaderFlags {
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Self, SchemaError> {
        Self::from_value(&schema::read(&flags_schema(), reader)?)
    }

    pub fn from_value(v: &Value) -> Result<Self, SchemaError> {
        Ok(Self {
            reserved:       v.int_field("reserved")?,
            has_encryption: v.bool_field("has_encryption")?,
            has_checksum:   v.bool_field("has_checksum")?,
            reserved2:      v.int_field("reserved2")?,
        })
    }
}

// ── EncryptedKeyBlock ────────────────────────────────────────────────────────

/// The two asymmetrically protected blocks carrying the header cipher key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKeyBlock {
    pub key_block1: [u8; KEY_BLOCK_LEN],
    pub key_block2: [u8; KEY_BLOCK_LEN],
}

impl EncryptedKeyBlock {
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Self, SchemaError> {
        let v = schema::read(&key_block_schema(), reader)?;
        Ok(Self {
            key_block1: fixed_block(&v, "key_block1")?,
            key_block2: fixed_block(&v, "key_block2")?,
        })
    }
}

fn fixed_block(v: &Value, name: &'static str) -> Result<[u8; KEY_BLOCK_LEN], SchemaError> {
    v.bytes_field(name)?
        .try_into()
        .map_err(|_| SchemaError::TypeMismatch { field: name, expected: "a 40-byte block" })
}

// ── MixHeader ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderRecord {
    pub file_id: u32,
    pub offset:  u32,
    pub size:    u32,
}

impl HeaderRecord {
    pub fn from_value(v: &Value) -> Result<Self, SchemaError> {
        Ok(Self {
            file_id: v.int_field("file_id")?,
            offset:  v.int_field("offset")?,
            size:    v.int_field("size")?,
        })
    }
}

/// Decoded header.  `records.len() == num_files` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixHeader {
    pub num_files: u16,
    pub data_size: u32,
    pub records:   Vec<HeaderRecord>,
}

impl MixHeader {
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Self, SchemaError> {
        Self::from_value(&schema::read(&header_schema(), reader)?)
    }

    pub fn from_value(v: &Value) -> Result<Self, SchemaError> {
        let records = v
            .list_field("records")?
            .iter()
            .map(HeaderRecord::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            num_files: v.int_field("num_files")?,
            data_size: v.int_field("data_size")?,
            records,
        })
    }

    pub fn find(&self, file_id: u32) -> Option<&HeaderRecord> {
        self.records.iter().find(|r| r.file_id == file_id)
    }

    /// Size of the plaintext header on disk (count, data size, records).
    pub fn encoded_len(&self) -> usize {
        6 + self.records.len() * RECORD_SIZE
    }
}
