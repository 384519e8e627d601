/// Askbox Crypto
///
/// Bot tokens are never persisted in plaintext. Each token is sealed with
/// AES-256-GCM under a process-wide key, with a fresh random nonce per
/// value, so identical tokens produce different ciphertexts.
pub mod keys;
pub mod seal;
