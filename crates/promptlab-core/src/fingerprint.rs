use sha2::{Digest, Sha256};

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Short form used in human-readable output.
pub fn short(hex: &str) -> &str {
    &hex[..hex.len().min(12)]
}
