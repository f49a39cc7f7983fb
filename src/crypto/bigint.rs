//! Byte-block ⇄ big-integer conversion and modular exponentiation.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::schema::Endianness;

/// Interpret `bytes` as an unsigned integer.
///
/// `Little` treats the first byte as least significant, `Big` as most.
pub fn bytes_to_integer(bytes: &[u8], order: Endianness) -> BigUint {
    match order {
        Endianness::Little => BigUint::from_bytes_le(bytes),
        Endianness::Big    => BigUint::from_bytes_be(bytes),
    }
}

/// Encode `value` into exactly `byte_count` bytes.
///
/// Byte `i` (by significance) is `(value >> 8*i) & 0xFF`; bits above
/// `8 * byte_count` are dropped and short values are zero-padded.
pub fn integer_to_bytes(value: &BigUint, byte_count: usize, order: Endianness) -> Vec<u8> {
    let le = value.to_bytes_le();
    let mut out: Vec<u8> = (0..byte_count)
        .map(|i| le.get(i).copied().unwrap_or(0))
        .collect();
    if order == Endianness::Big {
        out.reverse();
    }
    out
}

/// Encode several integers back to back, each `byte_count` bytes wide.
pub fn integers_to_bytes(values: &[BigUint], byte_count: usize, order: Endianness) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * byte_count);
    for v in values {
        out.extend(integer_to_bytes(v, byte_count, order));
    }
    out
}

/// Square-and-multiply `base^exponent mod modulus`.
///
/// Returns `None` when `modulus` is zero; that is an input error, not a
/// result, and callers decide how to report it.
pub fn mod_pow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    if modulus.is_zero() {
        return None;
    }
    let mut result   = BigUint::one() % modulus;
    let mut base     = base % modulus;
    let mut exponent = exponent.clone();
    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
        exponent >>= 1u32;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn byte_order_selects_significance() {
        let bytes = [0x01, 0x02, 0x03];
        assert_eq!(bytes_to_integer(&bytes, Endianness::Little), BigUint::from(0x03_02_01u32));
        assert_eq!(bytes_to_integer(&bytes, Endianness::Big), BigUint::from(0x01_02_03u32));
    }

    #[test]
    fn encoding_pads_and_truncates() {
        let v = BigUint::from(0x0102_0304u32);
        assert_eq!(integer_to_bytes(&v, 6, Endianness::Little), vec![4, 3, 2, 1, 0, 0]);
        assert_eq!(integer_to_bytes(&v, 6, Endianness::Big), vec![0, 0, 1, 2, 3, 4]);
        assert_eq!(integer_to_bytes(&v, 2, Endianness::Little), vec![4, 3]);
        assert_eq!(integer_to_bytes(&BigUint::zero(), 3, Endianness::Big), vec![0, 0, 0]);
    }

    #[test]
    fn batch_export_concatenates() {
        let values = [BigUint::from(0x0102u32), BigUint::from(0x03u32)];
        assert_eq!(integers_to_bytes(&values, 2, Endianness::Big), vec![1, 2, 0, 3]);
    }

    #[test]
    fn zero_modulus_is_rejected() {
        assert_eq!(mod_pow(&BigUint::from(2u32), &BigUint::from(3u32), &BigUint::zero()), None);
    }

    #[test]
    fn small_values() {
        let m = |b: u32, e: u32, n: u32| mod_pow(&b.into(), &e.into(), &n.into()).unwrap();
        assert_eq!(m(4, 13, 497), BigUint::from(445u32));
        assert_eq!(m(7, 0, 13), BigUint::one());
        assert_eq!(m(7, 5, 1), BigUint::zero());
    }

    proptest! {
        #[test]
        fn matches_reference_modpow(
            base in proptest::collection::vec(any::<u8>(), 0..48),
            exp  in proptest::collection::vec(any::<u8>(), 0..8),
            modulus in proptest::collection::vec(any::<u8>(), 1..48),
        ) {
            let b = BigUint::from_bytes_le(&base);
            let e = BigUint::from_bytes_le(&exp);
            let n = BigUint::from_bytes_le(&modulus);
            prop_assume!(n > BigUint::one());
            prop_assert_eq!(mod_pow(&b, &e, &n).unwrap(), b.modpow(&e, &n));
        }

        #[test]
        fn bytes_round_trip_when_value_fits(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
            for order in [Endianness::Little, Endianness::Big] {
                let v = bytes_to_integer(&bytes, order);
                prop_assert_eq!(integer_to_bytes(&v, bytes.len(), order), bytes.clone());
            }
        }
    }
}
