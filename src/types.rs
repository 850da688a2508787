//! Shared primitive types.

/// BLAKE3 digest identifying an immutable node in the backing store.
pub type Hash = [u8; 32];

/// Full lowercase hex rendering of a hash.
pub fn hash_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// First eight bytes of a hash in hex, for log lines.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..8])
}

/// Parse a 64-character hex string back into a hash.
pub fn parse_hash(s: &str) -> Option<Hash> {
    let bytes = hex::decode(s.trim()).ok()?;
    bytes.try_into().ok()
}
