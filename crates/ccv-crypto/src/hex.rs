//! Lowercase hex encoding for keys, signatures, points and scalars.

use ccv_core::CryptoError;

/// Encode bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// First four bytes as hex, for `Debug` output.
pub fn prefix(bytes: &[u8]) -> String {
    encode(&bytes[..bytes.len().min(4)])
}

/// Decode a hex string (case-insensitive, surrounding whitespace ignored).
pub fn decode(hex: &str) -> Result<Vec<u8>, CryptoError> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(CryptoError::Encoding(
            "hex string must have even length".to_string(),
        ));
    }
    if !hex.is_ascii() {
        return Err(CryptoError::Encoding("hex string must be ASCII".to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| CryptoError::Encoding(format!("invalid hex at position {i}: {e}")))
        })
        .collect()
}

/// Decode a hex string into exactly `N` bytes.
pub fn decode_array<const N: usize>(hex: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode(hex)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        CryptoError::Encoding(format!("expected {N} bytes, got {}", v.len()))
    })
}
