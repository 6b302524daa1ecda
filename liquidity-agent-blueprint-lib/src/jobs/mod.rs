pub mod message;
pub mod position;

/// Convert a raw 20-byte EVM caller address to a lowercase hex string with `0x` prefix.
pub(crate) fn caller_hex(bytes: &[u8; 20]) -> String {
    let mut s = String::with_capacity(42);
    s.push_str("0x");
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
    }
    s
}
