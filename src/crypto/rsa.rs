//! Raw (textbook, unpadded) RSA block operations.
//!
//! **Not secure.**  No padding scheme is applied, so these functions give no
//! confidentiality or integrity on their own.  They exist because the legacy
//! container format stores its header key this way and compatibility needs
//! the exact unpadded arithmetic.
//!
//! All four directions are the same [`mod_pow`]; they differ only in which
//! exponent is supplied and which side calls it "encrypt".  The directions
//! that take the public exponent refuse blocks that are not smaller than the
//! modulus, since the result would not be recoverable.

use num_bigint::BigUint;

use super::bigint::mod_pow;
use super::KeyError;

/// Encrypt with the secret exponent so that anyone holding the public
/// exponent can decrypt (origin authentication, not secrecy).
pub fn encrypt_with_secret(
    block:           &BigUint,
    secret_exponent: &BigUint,
    modulus:         &BigUint,
) -> Result<BigUint, KeyError> {
    raw(block, secret_exponent, modulus)
}

/// Undo [`encrypt_with_secret`] using the public exponent.
pub fn decrypt_with_public(
    block:           &BigUint,
    public_exponent: &BigUint,
    modulus:         &BigUint,
) -> Result<BigUint, KeyError> {
    check_block(block, modulus)?;
    raw(block, public_exponent, modulus)
}

/// Encrypt so that only the holder of the secret exponent can decrypt.
pub fn encrypt_with_public(
    block:           &BigUint,
    public_exponent: &BigUint,
    modulus:         &BigUint,
) -> Result<BigUint, KeyError> {
    check_block(block, modulus)?;
    raw(block, public_exponent, modulus)
}

/// Undo [`encrypt_with_public`] using the secret exponent.
pub fn decrypt_with_secret(
    block:           &BigUint,
    secret_exponent: &BigUint,
    modulus:         &BigUint,
) -> Result<BigUint, KeyError> {
    raw(block, secret_exponent, modulus)
}

fn check_block(block: &BigUint, modulus: &BigUint) -> Result<(), KeyError> {
    if block >= modulus {
        return Err(KeyError::BlockTooLarge);
    }
    Ok(())
}

fn raw(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> Result<BigUint, KeyError> {
    mod_pow(base, exponent, modulus).ok_or(KeyError::InvalidArithmeticInput)
}
