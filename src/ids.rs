//! Identifier generation for stops and movements.

use uuid::Uuid;

/// Default prefix for generated stop identifiers
pub const DEFAULT_PREFIX: &str = "zz";

/// Suffix tag appended to every generated identifier
pub const ID_SUFFIX: &str = "APP2";

/// Offset added to derived movement identifiers
pub const MOVEMENT_ID_OFFSET: u64 = 1_000_000;

/// Modulus applied to the hash fallback before the offset is added
pub const MOVEMENT_HASH_MODULUS: u64 = 10_000_000;

/// Generate a fresh opaque identifier: `prefix` + 16 random hex characters + `APP2`.
///
/// Randomness comes from a v4 UUID, so uniqueness is probabilistic rather
/// than sequential and no coordination is needed between workers.
pub fn generate_id(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}{}{}", prefix, &random[..16], ID_SUFFIX)
}

/// Derive a movement identifier from an order reference number.
///
/// The digits of the reference are read as an integer and offset by
/// [`MOVEMENT_ID_OFFSET`]. References without digits, or whose digit run
/// overflows `u64`, fall back to `fnv1a_64(reference) % 10_000_000 + 1_000_000`.
pub fn movement_id(reference: &str) -> String {
    let digits: String = reference.chars().filter(|c| c.is_ascii_digit()).collect();

    let derived = digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_add(MOVEMENT_ID_OFFSET));

    match derived {
        Some(id) => id.to_string(),
        None => (fnv1a_64(reference.as_bytes()) % MOVEMENT_HASH_MODULUS + MOVEMENT_ID_OFFSET).to_string(),
    }
}

/// 64-bit FNV-1a hash. Stable across runs and platforms.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id(DEFAULT_PREFIX);

        assert!(id.starts_with("zz"));
        assert!(id.ends_with("APP2"));
        assert_eq!(id.len(), 2 + 16 + 4);
        assert!(id[2..18].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_id_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_id("zz")).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_movement_id_from_digits() {
        assert_eq!(movement_id("12345"), "1012345");
        assert_eq!(movement_id("LD-0042"), "1000042");
    }

    #[test]
    fn test_movement_id_hash_fallback_is_stable() {
        let first = movement_id("ABC");
        let second = movement_id("ABC");
        assert_eq!(first, second);

        let value: u64 = first.parse().unwrap();
        assert!((MOVEMENT_ID_OFFSET..MOVEMENT_ID_OFFSET + MOVEMENT_HASH_MODULUS).contains(&value));
    }

    #[test]
    fn test_movement_id_overflowing_digits_fall_back() {
        let id = movement_id("99999999999999999999999");
        let value: u64 = id.parse().unwrap();
        assert!(value < MOVEMENT_ID_OFFSET + MOVEMENT_HASH_MODULUS);
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
    }
}
