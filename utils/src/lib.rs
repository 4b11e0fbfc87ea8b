//! Leverage common functionality across multiple primitives.

mod time;
pub use time::SystemTimeExt;

/// Converts bytes to a hexadecimal string.
pub fn hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes.iter() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Converts a hexadecimal string to bytes.
pub fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Converts a hexadecimal string to bytes, stripping whitespace and/or a `0x`
/// prefix. Commonly used in testing to encode external test vectors without
/// modification.
pub fn from_hex_formatted(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.replace(['\t', '\n', '\r', ' '], "");
    let res = hex.strip_prefix("0x").unwrap_or(&hex);
    from_hex(res)
}

/// Combines a namespace and a message into a single payload that no other
/// `(namespace, message)` pair can produce.
///
/// The namespace is prefixed with its length (4 bytes, big-endian), so moving
/// bytes between the namespace and the message always changes the payload.
/// Used to domain-separate signatures: a signature produced for one context
/// can never verify in another.
pub fn union_unique(namespace: &[u8], message: &[u8]) -> Vec<u8> {
    let prefix = (namespace.len() as u32).to_be_bytes();
    let mut payload = Vec::with_capacity(prefix.len() + namespace.len() + message.len());
    payload.extend_from_slice(&prefix);
    payload.extend_from_slice(namespace);
    payload.extend_from_slice(message);
    payload
}
