/// Help desk crypto helpers.
///
/// - Secret hashing: Argon2id, random 16-byte salt per credential, 256-bit
///   derived key, PHC string storage.
/// - Body sealing: AES-256-GCM with a per-write random nonce. Sealed bodies
///   are stored as base64 text.
/// - Random one-time secrets and invitation codes.
pub mod keys;
pub mod secret;
pub mod seal;

pub use keys::{BodyKey, generate_body_key, key_from_base64, key_to_base64};
pub use seal::{open_body, seal_body};
pub use secret::{HashCost, SecretHasher, generate_code};
