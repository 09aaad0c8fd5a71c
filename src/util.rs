//! Byte-encoding primitives shared by the index codec and the sequence
//! counter.

/// Big-endian 8-byte encoding. Lexicographic byte order matches numeric
/// order for unsigned integers, so sequence-generated keys sort by
/// insertion order.
pub fn u64_to_bytes(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

/// Inverse of [`u64_to_bytes`]. Panics if `b` is not exactly 8 bytes; callers
/// only ever feed it bytes this crate wrote.
pub fn bytes_to_u64(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    u64::from_be_bytes(buf)
}

/// IEEE-754 bit pattern, big-endian. Preserves order for non-negative
/// doubles only; negative doubles sort in reverse of numeric order because
/// of the sign bit (see spec §9 open question, accepted as-is).
pub fn f64_to_bytes(v: f64) -> [u8; 8] {
    v.to_bits().to_be_bytes()
}

/// Inverse of [`f64_to_bytes`].
pub fn bytes_to_f64(b: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    f64::from_bits(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_round_trips() {
        for v in [0u64, 1, 255, 256, u64::MAX] {
            assert_eq!(bytes_to_u64(&u64_to_bytes(v)), v);
        }
    }

    #[test]
    fn u64_bytes_sort_like_numbers() {
        let mut values = vec![500u64, 3, 70, 1, 2];
        let mut encoded: Vec<[u8; 8]> = values.iter().map(|v| u64_to_bytes(*v)).collect();
        encoded.sort();
        values.sort();
        let decoded: Vec<u64> = encoded.iter().map(|b| bytes_to_u64(b)).collect();
        assert_eq!(decoded, values);
    }

    #[test]
    fn f64_round_trips() {
        for v in [0.0f64, 1.5, 1e100, f64::MAX] {
            assert_eq!(bytes_to_f64(&f64_to_bytes(v)), v);
        }
    }

    #[test]
    fn f64_bytes_sort_like_numbers_when_non_negative() {
        let mut values = vec![0.0f64, 100.5, 3.25, 9999.0, 1.0];
        let mut encoded: Vec<[u8; 8]> = values.iter().map(|v| f64_to_bytes(*v)).collect();
        encoded.sort();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let decoded: Vec<f64> = encoded.iter().map(|b| bytes_to_f64(b)).collect();
        assert_eq!(decoded, values);
    }
}
