//! Byte-stream view over an 8-byte block cipher.
//!
//! [`BlockCipherStream`] pulls exactly one ciphertext block at a time from the
//! wrapped reader, decrypts it, and serves the plaintext through [`Read`].
//! The schema reader can then consume encrypted data without knowing about
//! the cipher.
//!
//! A clean end of the wrapped reader on a block boundary reads as EOF.  A
//! trailing partial block is an `UnexpectedEof` error: the cipher never sees
//! anything but whole blocks.

use blowfish::cipher::consts::U8;
use blowfish::cipher::{Block, BlockDecrypt, BlockSizeUser};
use log::trace;
use std::io::{self, Read};

pub const BLOCK_LEN: usize = 8;

/// Decrypting reader.  Holds the current plaintext block and the position of
/// the next byte within it; there is no lookahead.
pub struct BlockCipherStream<R, C> {
    inner:       R,
    cipher:      C,
    block:       [u8; BLOCK_LEN],
    pos:         usize,
    blocks_read: u64,
}

impl<R, C> BlockCipherStream<R, C>
where
    R: Read,
    C: BlockDecrypt + BlockSizeUser<BlockSize = U8>,
{
    pub fn new(inner: R, cipher: C) -> Self {
        Self {
            inner,
            cipher,
            block:       [0u8; BLOCK_LEN],
            pos:         BLOCK_LEN, // forces a refill on first access
            blocks_read: 0,
        }
    }

    /// Next plaintext byte; `UnexpectedEof` once the ciphertext runs out.
    pub fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Number of whole ciphertext blocks consumed so far.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Returns `false` on a clean end of input.
    fn refill(&mut self) -> io::Result<bool> {
        let mut raw    = [0u8; BLOCK_LEN];
        let mut filled = 0;
        while filled < BLOCK_LEN {
            match self.inner.read(&mut raw[filled..]) {
                Ok(0)  => break,
                Ok(n)  => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            return Ok(false);
        }
        if filled < BLOCK_LEN {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated ciphertext: {filled} of {BLOCK_LEN} block bytes"),
            ));
        }

        let mut block = Block::<C>::clone_from_slice(&raw);
        self.cipher.decrypt_block(&mut block);
        self.block.copy_from_slice(&block);
        self.pos = 0;
        self.blocks_read += 1;
        trace!("decrypted block {}", self.blocks_read);
        Ok(true)
    }
}

impl<R, C> Read for BlockCipherStream<R, C>
where
    R: Read,
    C: BlockDecrypt + BlockSizeUser<BlockSize = U8>,
{
    /// Serves at most the remainder of the current block per call.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos == BLOCK_LEN && !self.refill()? {
            return Ok(0);
        }
        let n = (BLOCK_LEN - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.block[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
