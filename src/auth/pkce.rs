//! PKCE verifier and challenge generation (RFC 7636)

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Verifier length; RFC 7636 allows 43 to 128
const VERIFIER_LENGTH: usize = 64;

/// Unreserved URI characters
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Challenge method name as the hosted auth service spells it
pub const CHALLENGE_METHOD: &str = "s256";

/// A fresh verifier with its S256 challenge
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let verifier: String = (0..VERIFIER_LENGTH)
            .map(|_| VERIFIER_CHARSET[rng.gen_range(0..VERIFIER_CHARSET.len())] as char)
            .collect();
        let challenge = challenge_for(&verifier);
        Self { verifier, challenge }
    }
}

/// BASE64URL(SHA256(verifier)) without padding
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
