//! Declarative binary schemas and the recursive reader that walks them.
//!
//! A [`SchemaNode`] describes *what* is on the wire; [`read`] turns it into a
//! [`Value`] tree by pulling bytes from any [`Read`] source.  The reader does
//! not care whether the source is a plain file or a decrypting adapter.
//!
//! # Length references
//! A [`SchemaNode::List`] takes its element count from a sibling field parsed
//! earlier in the same struct.  Resolution goes through an explicit context
//! (the fields already produced by the enclosing struct walk) passed down the
//! recursion.  There is no shared table, so independent reads can run
//! concurrently.
//!
//! # Failure
//! Any short read surfaces as [`SchemaError::TruncatedStream`] and aborts the
//! whole walk.  A partially populated struct is never returned.

mod value;

pub use value::Value;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::io::{self, Read};
use thiserror::Error;

// ── Wire primitives ──────────────────────────────────────────────────────────

/// Byte order of a multi-byte integer (or of a big integer, see
/// [`crate::crypto::bigint`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Width of a fixed-size integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::W8  => 1,
            IntWidth::W16 => 2,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
        }
    }

    /// Smallest width able to hold `bits` bits.  `None` for 0 or > 64.
    pub fn containing(bits: u32) -> Option<Self> {
        match bits {
            1..=8   => Some(IntWidth::W8),
            9..=16  => Some(IntWidth::W16),
            17..=32 => Some(IntWidth::W32),
            33..=64 => Some(IntWidth::W64),
            _       => None,
        }
    }
}

/// Order in which bitfield subfields are packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// The underlying bytes form one little-endian integer; the first
    /// declared subfield occupies its least-significant bits.
    LsbFirst,
    /// Bits are consumed byte by byte from the most-significant bit of each
    /// byte; the first declared subfield occupies the top bits of byte 0.
    MsbFirst,
}

// ── Schema ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    FixedInt {
        width:  IntWidth,
        endian: Endianness,
    },
    /// Named subfields `(name, bit_width)` packed into the smallest integer
    /// that holds their summed width.
    Bitfield {
        order:  BitOrder,
        fields: Vec<(&'static str, u32)>,
    },
    FixedBytes {
        len: usize,
    },
    List {
        /// Name of an integer sibling parsed earlier in the enclosing struct.
        length_ref: &'static str,
        element:    Box<SchemaNode>,
    },
    Struct {
        fields: Vec<(&'static str, SchemaNode)>,
    },
}

impl SchemaNode {
    pub fn u8() -> Self {
        SchemaNode::FixedInt { width: IntWidth::W8, endian: Endianness::Little }
    }

    pub fn u16_le() -> Self {
        SchemaNode::FixedInt { width: IntWidth::W16, endian: Endianness::Little }
    }

    pub fn u32_le() -> Self {
        SchemaNode::FixedInt { width: IntWidth::W32, endian: Endianness::Little }
    }

    pub fn bytes(len: usize) -> Self {
        SchemaNode::FixedBytes { len }
    }

    pub fn bitfield(order: BitOrder, fields: &[(&'static str, u32)]) -> Self {
        SchemaNode::Bitfield { order, fields: fields.to_vec() }
    }

    pub fn list(length_ref: &'static str, element: SchemaNode) -> Self {
        SchemaNode::List { length_ref, element: Box::new(element) }
    }

    pub fn structure(fields: Vec<(&'static str, SchemaNode)>) -> Self {
        SchemaNode::Struct { fields }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Truncated stream: fewer bytes available than the field requires")]
    TruncatedStream,
    #[error("List length refers to unknown or non-integer sibling '{0}'")]
    UnknownLengthRef(&'static str),
    #[error("Missing field '{0}'")]
    MissingField(&'static str),
    #[error("Field '{field}' is not {expected}")]
    TypeMismatch {
        field:    &'static str,
        expected: &'static str,
    },
    #[error("Bitfield width of {0} bits does not fit a supported integer")]
    UnsupportedBitfieldWidth(u32),
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for SchemaError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            SchemaError::TruncatedStream
        } else {
            SchemaError::Io(e)
        }
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// Walk `node` against `reader`, producing a [`Value`] tree.
pub fn read<R: Read + ?Sized>(node: &SchemaNode, reader: &mut R) -> Result<Value, SchemaError> {
    read_node(node, reader, &[])
}

/// `siblings` are the fields already produced by the innermost enclosing
/// struct; only `List` consults them.
fn read_node<R: Read + ?Sized>(
    node:     &SchemaNode,
    reader:   &mut R,
    siblings: &[(&'static str, Value)],
) -> Result<Value, SchemaError> {
    match node {
        SchemaNode::FixedInt { width, endian } => {
            read_int(reader, *width, *endian).map(Value::Int)
        }
        SchemaNode::Bitfield { order, fields } => read_bitfield(reader, *order, fields),
        SchemaNode::FixedBytes { len } => {
            let mut buf = vec![0u8; *len];
            reader.read_exact(&mut buf)?;
            Ok(Value::Bytes(buf))
        }
        SchemaNode::List { length_ref, element } => {
            let count = resolve_length(siblings, *length_ref)?;
            // Counts come off the wire; don't trust them for preallocation.
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(read_node(element, reader, siblings)?);
            }
            Ok(Value::List(items))
        }
        SchemaNode::Struct { fields } => {
            let mut out: Vec<(&'static str, Value)> = Vec::with_capacity(fields.len());
            for (name, field) in fields {
                let value = read_node(field, reader, &out)?;
                out.push((*name, value));
            }
            Ok(Value::Struct(out))
        }
    }
}

fn read_int<R: Read + ?Sized>(
    reader: &mut R,
    width:  IntWidth,
    endian: Endianness,
) -> Result<u64, SchemaError> {
    let mut buf = [0u8; 8];
    let n = width.bytes();
    reader.read_exact(&mut buf[..n])?;
    Ok(match endian {
        Endianness::Little => LittleEndian::read_uint(&buf[..n], n),
        Endianness::Big    => BigEndian::read_uint(&buf[..n], n),
    })
}

fn read_bitfield<R: Read + ?Sized>(
    reader: &mut R,
    order:  BitOrder,
    fields: &[(&'static str, u32)],
) -> Result<Value, SchemaError> {
    let total: u32 = fields.iter().map(|(_, bits)| *bits).sum();
    let width = IntWidth::containing(total)
        .ok_or(SchemaError::UnsupportedBitfieldWidth(total))?;

    let mut buf = [0u8; 8];
    let n = width.bytes();
    reader.read_exact(&mut buf[..n])?;
    let raw = &buf[..n];

    let mut out = Vec::with_capacity(fields.len());
    let mut cursor = 0u32;
    match order {
        BitOrder::LsbFirst => {
            let word = LittleEndian::read_uint(raw, n);
            for (name, bits) in fields {
                out.push((*name, Value::Int((word >> cursor) & mask(*bits))));
                cursor += bits;
            }
        }
        BitOrder::MsbFirst => {
            for (name, bits) in fields {
                let mut v = 0u64;
                for _ in 0..*bits {
                    let byte = raw[(cursor / 8) as usize];
                    let bit  = (byte >> (7 - cursor % 8)) & 1;
                    v = (v << 1) | u64::from(bit);
                    cursor += 1;
                }
                out.push((*name, Value::Int(v)));
            }
        }
    }
    Ok(Value::Struct(out))
}

#[inline]
fn mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

fn resolve_length(
    siblings:   &[(&'static str, Value)],
    length_ref: &'static str,
) -> Result<usize, SchemaError> {
    siblings
        .iter()
        .rev()
        .find(|(name, _)| *name == length_ref)
        .and_then(|(_, v)| v.as_int())
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(SchemaError::UnknownLengthRef(length_ref))
}
