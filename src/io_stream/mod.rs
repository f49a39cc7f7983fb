//! MIX header decoder.
//!
//! # Layout detection
//! The first little-endian `u16` decides the layout:
//!
//! | marker | layout | what follows |
//! |--------|--------|--------------|
//! | `!= 0` | legacy | the marker *is* `num_files`; rewind and read the header |
//! | `== 0` | modern | flags word, then the header (plain or encrypted) |
//!
//! # Encrypted headers
//! When the flags carry the encryption bit, two 40-byte key blocks follow.
//! [`crate::crypto::recover_key`] turns them into a Blowfish key and the
//! header is read through a [`BlockCipherStream`] over the remaining bytes.
//! The stream only consumes whole 8-byte blocks, so the raw reader ends up
//! on the first byte of the body.
//!
//! # Reentrancy
//! Decoding holds no state outside the call.  Concurrent decodes need their
//! own reader each; the name database may be shared.

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use serde::Serialize;
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;

use crate::crypto::stream::BlockCipherStream;
use crate::crypto::{header_cipher, recover_key, KeyError, PublicKey};
use crate::header::{EncryptedKeyBlock, HeaderFlags, HeaderRecord, MixHeader};
use crate::schema::SchemaError;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum MixError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("No record with id {0:08x}")]
    EntryNotFound(u32),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl MixError {
    /// True when the input ran out before a field was complete.
    pub fn is_truncated(&self) -> bool {
        matches!(self, MixError::Schema(SchemaError::TruncatedStream))
    }
}

// ── Decoded header ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layout {
    /// No marker or flags; the file starts with the header.
    Legacy,
    Modern { flags: HeaderFlags },
}

impl Layout {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Layout::Modern { flags } if flags.has_encryption)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Layout::Legacy                                      => "legacy",
            Layout::Modern { flags } if flags.has_encryption    => "modern (encrypted)",
            Layout::Modern { .. }                               => "modern",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedHeader {
    pub layout:      Layout,
    pub header:      MixHeader,
    /// Absolute reader position of the first body byte; record offsets are
    /// relative to it.
    pub body_offset: u64,
}

/// Decode the header starting at the reader's current position.
///
/// The reader must be positioned at the first byte of the container; for a
/// standalone file that is offset 0.  On a legacy container the reader is
/// rewound to that position before the header is parsed, so a container
/// embedded in a larger stream decodes in place.  `body_offset` stays
/// absolute.  Either the whole header is returned or an error; nothing
/// partial.
pub fn decode_header<R: Read + Seek>(reader: &mut R, key: &PublicKey) -> Result<DecodedHeader, MixError> {
    let start  = reader.stream_position()?;
    let marker = reader.read_u16::<LittleEndian>().map_err(SchemaError::from)?;

    if marker != 0 {
        debug!("legacy layout (first word {marker:#06x}); rewinding to {start}");
        reader.seek(SeekFrom::Start(start))?;
        let header = MixHeader::read(reader)?;
        return Ok(DecodedHeader {
            layout:      Layout::Legacy,
            header,
            body_offset: reader.stream_position()?,
        });
    }

    let flags = HeaderFlags::read(reader)?;
    debug!(
        "modern layout (encrypted: {}, checksum: {})",
        flags.has_encryption, flags.has_checksum
    );

    let header = if flags.has_encryption {
        let blocks = EncryptedKeyBlock::read(reader)?;
        let key    = recover_key(&blocks.key_block1, &blocks.key_block2, key)?;
        let mut stream = BlockCipherStream::new(&mut *reader, header_cipher(&key)?);
        let header = MixHeader::read(&mut stream)?;
        debug!("header decrypted from {} cipher blocks", stream.blocks_read());
        header
    } else {
        MixHeader::read(reader)?
    };

    Ok(DecodedHeader {
        layout:      Layout::Modern { flags },
        header,
        body_offset: reader.stream_position()?,
    })
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// A container with its header decoded up front.
pub struct MixReader<R: Read + Seek> {
    reader:      R,
    pub decoded: DecodedHeader,
}

impl<R: Read + Seek> MixReader<R> {
    /// Decode using the built-in Westwood public key.
    pub fn new(reader: R) -> Result<Self, MixError> {
        Self::with_key(reader, &PublicKey::westwood())
    }

    pub fn with_key(mut reader: R, key: &PublicKey) -> Result<Self, MixError> {
        let decoded = decode_header(&mut reader, key)?;
        Ok(Self { reader, decoded })
    }

    pub fn header(&self) -> &MixHeader {
        &self.decoded.header
    }

    pub fn record(&self, file_id: u32) -> Result<HeaderRecord, MixError> {
        self.decoded
            .header
            .find(file_id)
            .copied()
            .ok_or(MixError::EntryNotFound(file_id))
    }

    /// Raw body bytes of one record.  No content validation is done.
    pub fn read_entry(&mut self, file_id: u32) -> Result<Vec<u8>, MixError> {
        let record = self.record(file_id)?;
        let start  = self.decoded.body_offset + u64::from(record.offset);
        self.reader.seek(SeekFrom::Start(start))?;

        let mut data = Vec::new();
        (&mut self.reader).take(u64::from(record.size)).read_to_end(&mut data)?;
        if data.len() != record.size as usize {
            return Err(SchemaError::TruncatedStream.into());
        }
        Ok(data)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::stream::BLOCK_LEN;
    use crate::crypto::tests::seal_key;
    use crate::crypto::MixBlowfish;
    use blowfish::cipher::{Block, BlockEncrypt};
    use std::io::Cursor;

    fn header_bytes(records: &[(u32, u32, u32)], data_size: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(records.len() as u16).to_le_bytes());
        out.extend_from_slice(&data_size.to_le_bytes());
        for (id, off, size) in records {
            out.extend_from_slice(&id.to_le_bytes());
            out.extend_from_slice(&off.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
        }
        out
    }

    fn encrypted_container(records: &[(u32, u32, u32)], data_size: u32, body: &[u8]) -> Vec<u8> {
        let key: [u8; 56] = std::array::from_fn(|i| (i as u8).wrapping_mul(7) ^ 0x5C);
        let (b1, b2) = seal_key(&key);
        let cipher = header_cipher(&key).unwrap();

        let mut plain = header_bytes(records, data_size);
        plain.resize(plain.len().div_ceil(BLOCK_LEN) * BLOCK_LEN, 0);

        let mut out = vec![0x00, 0x00, 0x02, 0x00];
        out.extend_from_slice(&b1);
        out.extend_from_slice(&b2);
        for chunk in plain.chunks(BLOCK_LEN) {
            let mut block = Block::<MixBlowfish>::clone_from_slice(chunk);
            cipher.encrypt_block(&mut block);
            out.extend_from_slice(&block);
        }
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn legacy_rewinds_and_reads_from_start() {
        let mut bytes = vec![0x02, 0x00, 0x10, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&header_bytes(&[(1, 0, 6), (2, 6, 10)], 0)[6..]);
        let mut cur = Cursor::new(bytes);
        let d = decode_header(&mut cur, &PublicKey::westwood()).unwrap();
        assert_eq!(d.layout, Layout::Legacy);
        assert_eq!(d.header.num_files, 2);
        assert_eq!(d.header.data_size, 16);
        assert_eq!(d.header.records.len(), 2);
        assert_eq!(d.body_offset, 30);
    }

    #[test]
    fn legacy_container_embedded_at_offset() {
        let mut bytes = vec![0xAA; 10];
        bytes.extend_from_slice(&header_bytes(&[(9, 0, 2)], 2));
        bytes.extend_from_slice(b"hi");
        let mut cur = Cursor::new(bytes);
        cur.set_position(10);
        let d = decode_header(&mut cur, &PublicKey::westwood()).unwrap();
        assert_eq!(d.layout, Layout::Legacy);
        assert_eq!(d.header.num_files, 1);
        assert_eq!(d.header.records[0], HeaderRecord { file_id: 9, offset: 0, size: 2 });
        assert_eq!(d.body_offset, 10 + 18);
    }

    #[test]
    fn modern_plain_reads_after_flags() {
        let mut bytes = vec![0x00, 0x00, 0x01, 0x00];
        bytes.extend_from_slice(&header_bytes(&[(0xCAFE, 0, 3)], 3));
        bytes.extend_from_slice(b"abc");
        let mut r = MixReader::new(Cursor::new(bytes)).unwrap();
        let flags = match r.decoded.layout {
            Layout::Modern { flags } => flags,
            Layout::Legacy           => panic!("expected modern layout"),
        };
        assert!(flags.has_checksum && !flags.has_encryption);
        assert_eq!(r.decoded.body_offset, 4 + 18);
        assert_eq!(r.read_entry(0xCAFE).unwrap(), b"abc");
    }

    #[test]
    fn modern_encrypted_header_and_body_offset() {
        let records = [(0x1111_1111, 0, 4), (0x2222_2222, 4, 2)];
        let bytes = encrypted_container(&records, 6, b"WXYZ!?");
        let mut r = MixReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.decoded.layout.is_encrypted());
        assert_eq!(r.decoded.layout.name(), "modern (encrypted)");
        assert_eq!(r.header().num_files, 2);
        assert_eq!(r.header().records[1], HeaderRecord { file_id: 0x2222_2222, offset: 4, size: 2 });
        // 30 plaintext header bytes occupy four cipher blocks.
        assert_eq!(r.decoded.body_offset, 4 + 80 + 32);
        assert_eq!(r.read_entry(0x2222_2222).unwrap(), b"!?");
    }

    #[test]
    fn empty_encrypted_header_is_valid() {
        let bytes = encrypted_container(&[], 0, &[]);
        let r = MixReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.header().records.is_empty());
    }

    #[test]
    fn truncated_ciphertext_fails_whole_decode() {
        let mut bytes = encrypted_container(&[(1, 0, 0), (2, 0, 0)], 0, &[]);
        bytes.truncate(bytes.len() - 3);
        let err = MixReader::new(Cursor::new(bytes)).err().unwrap();
        assert!(err.is_truncated(), "{err}");
    }

    #[test]
    fn missing_key_blocks_are_truncation() {
        let mut bytes = vec![0x00, 0x00, 0x02, 0x00];
        bytes.extend_from_slice(&[0u8; 50]);
        let err = decode_header(&mut Cursor::new(bytes), &PublicKey::westwood()).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn oversized_key_block_is_reported() {
        let mut bytes = vec![0x00, 0x00, 0x02, 0x00];
        bytes.extend_from_slice(&[0xFFu8; 80]);
        bytes.extend_from_slice(&[0u8; 16]);
        let err = decode_header(&mut Cursor::new(bytes), &PublicKey::westwood()).unwrap_err();
        assert!(matches!(err, MixError::Key(KeyError::BlockTooLarge)));
    }

    #[test]
    fn empty_input_is_truncation() {
        let err = decode_header(&mut Cursor::new(Vec::<u8>::new()), &PublicKey::westwood()).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn entry_past_end_of_body_is_truncation() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&header_bytes(&[(7, 0, 100)], 100));
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut r = MixReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.read_entry(7).unwrap_err().is_truncated());
        assert!(matches!(r.read_entry(8), Err(MixError::EntryNotFound(8))));
    }
}
