use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// 256-bit key for sealing restricted article bodies.
pub type BodyKey = [u8; 32];

/// Generate a random 256-bit key for AES-256-GCM.
pub fn generate_body_key() -> BodyKey {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

/// Encode a key to base64 for configuration files.
pub fn key_to_base64(key: &BodyKey) -> String {
    BASE64.encode(key)
}

/// Decode a base64 key.
pub fn key_from_base64(encoded: &str) -> Result<BodyKey> {
    let bytes = BASE64.decode(encoded.trim())?;
    let key: BodyKey = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Invalid key length, expected 32 bytes"))?;
    Ok(key)
}
