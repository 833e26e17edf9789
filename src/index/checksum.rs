//! CRC32 checksums for journal lines

use crc32fast::Hasher;

pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_detects_change() {
        let a = compute_checksum(br#"{"op":"clear"}"#);
        let b = compute_checksum(br#"{"op":"clean"}"#);
        assert_eq!(a, compute_checksum(br#"{"op":"clear"}"#));
        assert_ne!(a, b);
    }
}
