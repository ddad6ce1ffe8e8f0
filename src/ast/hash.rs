//! Structural fingerprints.
//!
//! Every node carries a 512-bit hash computed once at construction from its
//! kind, sort, leaf payload and the cached hashes of its children. Two
//! structurally identical DAGs therefore hash equal without any traversal,
//! and commutative operators hash equal under operand swap.

use num_bigint::BigUint;
use primitive_types::U512;

use super::{NodeKind, Payload, Sort};

pub type Hash512 = U512;

const KIND_MIX: u64 = 0x9e37_79b9_7f4a_7c15;
const CHILD_MIX: u64 = 0xc2b2_ae3d_27d4_eb4f;

fn rotl(value: U512, shift: u32) -> U512 {
    let shift = shift % 512;
    if shift == 0 {
        value
    } else {
        (value << shift) | (value >> (512 - shift))
    }
}

fn fold_bytes(seed: u64, bytes: &[u8]) -> u64 {
    // FNV-1a, wide enough for name payloads.
    let mut acc = seed ^ 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        acc ^= u64::from(*byte);
        acc = acc.wrapping_mul(0x0000_0100_0000_01b3);
    }
    acc
}

fn payload_term(payload: &Payload) -> U512 {
    match payload {
        Payload::None => U512::zero(),
        Payload::Value(value) => biguint_term(value),
        Payload::Name(name) => U512::from(fold_bytes(1, name.as_bytes())),
        Payload::Variable(var) => {
            let mut term = U512::from(fold_bytes(var.id.0, var.name.as_bytes()));
            term |= U512::from(var.size) << 64;
            term
        }
        Payload::Reference(id) => U512::from(id.0.wrapping_mul(CHILD_MIX)),
    }
}

fn biguint_term(value: &BigUint) -> U512 {
    let bytes = value.to_bytes_le();
    let mut buf = [0u8; 64];
    let len = bytes.len().min(64);
    buf[..len].copy_from_slice(&bytes[..len]);
    let mut term = U512::from_little_endian(&buf);
    // Values wider than 512 bits still contribute their high part.
    for chunk in bytes[len..].chunks(8) {
        term = rotl(term, 64) ^ U512::from(fold_bytes(0, chunk));
    }
    term
}

/// Fingerprint of a node under construction.
///
/// Commutative kinds fold child hashes with a product so operand order is
/// immaterial; every other kind folds with a position-dependent rotation.
pub(crate) fn fingerprint<'a>(
    kind: NodeKind,
    sort: Sort,
    payload: &Payload,
    child_hashes: impl Iterator<Item = &'a Hash512>,
) -> Hash512 {
    let mut acc = U512::from((kind as u64 + 1).wrapping_mul(KIND_MIX));
    acc ^= U512::from(sort.bitwidth()) << 320;
    let sort_tag: u64 = match sort {
        Sort::Bool => 1,
        Sort::Bv(_) => 2,
        Sort::Int => 3,
        Sort::Symbol => 4,
    };
    acc ^= U512::from(sort_tag) << 400;
    acc ^= rotl(payload_term(payload), 13);

    if kind.is_commutative() {
        let mut product = U512::one();
        for hash in child_hashes {
            product = product.overflowing_mul(*hash | U512::one()).0;
        }
        acc ^= product;
    } else {
        for (position, hash) in child_hashes.enumerate() {
            acc = acc.overflowing_mul(U512::from(CHILD_MIX)).0;
            acc ^= rotl(*hash, (position as u32 + 1) * 9);
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotl_is_a_rotation() {
        let one = U512::one();
        assert_eq!(rotl(one, 0), one);
        assert_eq!(rotl(one, 1), U512::from(2));
        assert_eq!(rotl(one << 511, 1), one);
    }

    #[test]
    fn payload_distinguishes_values() {
        let three = Payload::Value(BigUint::from(3u8));
        let five = Payload::Value(BigUint::from(5u8));
        assert_ne!(payload_term(&three), payload_term(&five));
    }

    #[test]
    fn wide_values_keep_their_high_part() {
        let low = BigUint::from(1u8);
        let wide = &low << 600u32;
        assert_ne!(
            payload_term(&Payload::Value(low)),
            payload_term(&Payload::Value(wide))
        );
    }
}
