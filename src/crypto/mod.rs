//! Header-key recovery for encrypted MIX containers.
//!
//! An encrypted header is preceded by two 40-byte blocks.  Each is a raw RSA
//! block produced with the creator's *secret* exponent, so decrypting with
//! the well-known public exponent and modulus yields the Blowfish key:
//!
//! ```text
//! key = decrypt(block1)[0..39] || decrypt(block2)[0..17]     (56 bytes)
//! ```
//!
//! Both the ciphertext blocks and the decrypted integers are little-endian
//! byte strings.  Anyone holding the public material can recover the key:
//! this is authentication of origin, not confidentiality.

pub mod bigint;
pub mod rsa;
pub mod stream;

use byteorder::LittleEndian;
use blowfish::cipher::KeyInit;
use blowfish::Blowfish;
use log::trace;
use num_bigint::BigUint;
use thiserror::Error;

use crate::schema::Endianness;
use bigint::{bytes_to_integer, integer_to_bytes};

/// Byte length of each asymmetric key block.
pub const KEY_BLOCK_LEN: usize = 40;
/// Length of the recovered Blowfish key (the cipher's maximum).
pub const RECOVERED_KEY_LEN: usize = 56;
/// Bytes taken from the first decrypted block; the rest come from the second.
const FIRST_PART_LEN: usize = KEY_BLOCK_LEN - 1;

/// Public RSA exponent used by every Westwood container.
pub const WESTWOOD_EXPONENT: u32 = 0x10001;

/// Public RSA modulus used by every Westwood container, little-endian.
/// Decimal: 681994811107118991598552881669230523074742337494683459234572860554038768387821901289207730765589
pub const WESTWOOD_MODULUS_LE: [u8; KEY_BLOCK_LEN] = [
    0x15, 0x7f, 0x43, 0xaa, 0x3d, 0x4f, 0xfb, 0xd1,
    0xe6, 0xc1, 0xb0, 0xf8, 0x6a, 0x0e, 0xdd, 0xab,
    0x4a, 0xb0, 0x82, 0x66, 0xfa, 0x54, 0xaa, 0xe8,
    0xa2, 0x3f, 0x71, 0x51, 0xd6, 0x60, 0x51, 0x56,
    0xe4, 0xfc, 0x39, 0x6d, 0x08, 0xda, 0xbc, 0x51,
];

pub type RecoveredKey = [u8; RECOVERED_KEY_LEN];

/// Blowfish with little-endian half-block loading, as the format uses it.
pub type MixBlowfish = Blowfish<LittleEndian>;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Key block is not smaller than the modulus; decryption is undefined")]
    BlockTooLarge,
    #[error("Invalid modular arithmetic input (modulus must be at least 1)")]
    InvalidArithmeticInput,
    #[error("Cipher rejected a {0}-byte key")]
    CipherKeyLength(usize),
}

// ── PublicKey ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub modulus:  BigUint,
    pub exponent: BigUint,
}

impl PublicKey {
    pub fn new(modulus: BigUint, exponent: BigUint) -> Self {
        Self { modulus, exponent }
    }

    /// The public material shipped with the games.
    pub fn westwood() -> Self {
        Self {
            modulus:  BigUint::from_bytes_le(&WESTWOOD_MODULUS_LE),
            exponent: BigUint::from(WESTWOOD_EXPONENT),
        }
    }
}

impl Default for PublicKey {
    fn default() -> Self {
        Self::westwood()
    }
}

// ── Key recovery ─────────────────────────────────────────────────────────────

/// Recover the 56-byte header key from the two on-disk key blocks.
pub fn recover_key(
    key_block1: &[u8; KEY_BLOCK_LEN],
    key_block2: &[u8; KEY_BLOCK_LEN],
    key:        &PublicKey,
) -> Result<RecoveredKey, KeyError> {
    let first  = decrypt_key_block(key_block1, key)?;
    let second = decrypt_key_block(key_block2, key)?;

    let mut out = [0u8; RECOVERED_KEY_LEN];
    out[..FIRST_PART_LEN].copy_from_slice(&first[..FIRST_PART_LEN]);
    out[FIRST_PART_LEN..].copy_from_slice(&second[..RECOVERED_KEY_LEN - FIRST_PART_LEN]);
    trace!("recovered {RECOVERED_KEY_LEN}-byte header key");
    Ok(out)
}

/// Decrypt one key block with the public exponent, back to 40 bytes.
pub fn decrypt_key_block(
    block: &[u8; KEY_BLOCK_LEN],
    key:   &PublicKey,
) -> Result<Vec<u8>, KeyError> {
    let c = bytes_to_integer(block, Endianness::Little);
    let m = rsa::decrypt_with_public(&c, &key.exponent, &key.modulus)?;
    Ok(integer_to_bytes(&m, KEY_BLOCK_LEN, Endianness::Little))
}

/// Build the header cipher from a recovered key.
pub fn header_cipher(key: &[u8]) -> Result<MixBlowfish, KeyError> {
    MixBlowfish::new_from_slice(key).map_err(|_| KeyError::CipherKeyLength(key.len()))
}
