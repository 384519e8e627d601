use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use anyhow::{Result, anyhow};

/// Seal a token with AES-256-GCM.
/// Returns (ciphertext, nonce). The nonce is random per call, so sealing
/// the same token twice yields distinct ciphertexts.
pub fn seal_token(key: &[u8; 32], token: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, token.as_bytes())
        .map_err(|e| anyhow!("Seal failed: {}", e))?;

    Ok((ciphertext, nonce_bytes.to_vec()))
}

/// Open a sealed token. Fails on tampering or a wrong key; callers treat
/// failure as "no credential", never as a fatal error.
pub fn open_token(key: &[u8; 32], ciphertext: &[u8], nonce: &[u8]) -> Result<String> {
    if nonce.len() != 12 {
        return Err(anyhow!("Bad nonce length: {}", nonce.len()));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let nonce = Nonce::from_slice(nonce);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow!("Open failed: {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Sealed value is not UTF-8: {}", e))
}
