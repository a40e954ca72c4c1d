//! SHA-256 checksum utility for change detection.

use sha2::{Digest, Sha256};

/// Compute the hex SHA-256 checksum of a script or statement
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_checksum() {
        let a = compute_checksum("CREATE TABLE t (id INT)");
        let b = compute_checksum("CREATE TABLE t (id INT)");
        let c = compute_checksum("CREATE TABLE u (id INT)");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
