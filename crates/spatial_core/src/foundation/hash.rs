//! String hashing for surface tags and type names
//!
//! Triangles in the octree file carry a 32-bit hash of a surface name such
//! as `"Floor"` or `"Stair"`. The hash is FNV-1a style with a final fold of
//! the upper half into the lower half.

const OFFSET_BASIS: u32 = 2_166_136_261;
const PRIME: u32 = 16_777_619;

/// Hash a string the same way the octree file format does
pub fn string_hash(s: &str) -> u32 {
    let hash = s.bytes().fold(OFFSET_BASIS, |hash, byte| {
        PRIME.wrapping_mul(hash ^ u32::from(byte))
    });
    hash ^ (hash >> 16)
}

/// Tag carried by triangles that have no surface name
pub fn untagged() -> u32 {
    string_hash("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_hash() {
        assert_eq!(string_hash(""), OFFSET_BASIS ^ (OFFSET_BASIS >> 16));
        assert_eq!(untagged(), string_hash(""));
    }

    #[test]
    fn test_distinct_names_hash_differently() {
        assert_ne!(string_hash("Floor"), string_hash("Stair"));
        assert_eq!(string_hash("Floor"), string_hash("Floor"));
    }
}
