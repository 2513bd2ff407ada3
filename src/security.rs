//! Cryptographic primitives underpinning identity and the JWT builder.
//!
//! Every function here is a pure transform over bytes; none of them touch the network or
//! the credential store. [`crate::jwt`] and [`crate::identity`] are the only callers.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::RngCore;
use rsa::{
	RsaPrivateKey, RsaPublicKey,
	pss::{Signature, SigningKey},
	signature::{RandomizedSigner, SignatureEncoding},
};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Bit length mandated for every generated key pair.
pub const RSA_KEY_BITS: usize = 3072;

/// Computes the SHA-256 digest of `bytes`.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
	Sha256::digest(bytes).into()
}

/// Fills a freshly allocated buffer of `len` bytes from the process-wide CSPRNG.
///
/// `rand`'s thread-local generator is lazily seeded from the OS on first use per thread,
/// satisfying the "process-wide CSPRNG initialized once" requirement without a second,
/// hand-rolled RNG.
pub fn random_bytes(len: usize) -> Vec<u8> {
	let mut buf = vec![0u8; len];

	rand::rng().fill_bytes(&mut buf);

	buf
}

/// Generates an RSA-3072 key pair, returning `(public_pem, private_pem)` in PKCS#8 form.
///
/// `rsa` pins an older `rand_core` than the workspace's `rand`, so key generation and
/// signing borrow `rand_core::OsRng` directly rather than going through `rand::rng()`.
pub fn generate_rsa_3072() -> Result<(String, String)> {
	let mut rng = rand_core::OsRng;
	let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
		.map_err(|e| Error::Fail { reason: format!("RSA key generation failed: {e}.") })?;
	let public_key = RsaPublicKey::from(&private_key);
	let private_pem = private_key
		.to_pkcs8_pem(LineEnding::LF)
		.map_err(|e| Error::Fail { reason: format!("Failed to encode private key: {e}.") })?
		.to_string();
	let public_pem = public_key
		.to_public_key_pem(LineEnding::LF)
		.map_err(|e| Error::Fail { reason: format!("Failed to encode public key: {e}.") })?;

	Ok((public_pem, private_pem))
}

/// Signs `message` with RSA-PSS/SHA-256 using a salt length equal to the hash length.
pub fn rsa_sign_pss_sha256(private_pem: &str, message: &[u8]) -> Result<Vec<u8>> {
	let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem)
		.map_err(|e| Error::Fail { reason: format!("Failed to parse RSA private key: {e}.") })?;
	let signing_key = SigningKey::<Sha256>::new(private_key);
	let signature: Signature = signing_key.sign_with_rng(&mut rand_core::OsRng, message);

	Ok(signature.to_bytes().to_vec())
}

/// Extracts `(modulus_b64url, exponent_b64url)` from a PEM-encoded public key, for JWK
/// embedding in the registration body.
pub fn modulus_and_exponent(public_pem: &str) -> Result<(String, String)> {
	let public_key = RsaPublicKey::from_public_key_pem(public_pem)
		.map_err(|e| Error::Fail { reason: format!("Failed to parse RSA public key: {e}.") })?;
	let modulus = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
	let exponent = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());

	Ok((modulus, exponent))
}

/// Computes an HMAC-SHA256 MAC of `message` under `key`.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
	let mut mac = Hmac::<Sha256>::new_from_slice(key)
		.map_err(|e| Error::Fail { reason: format!("Failed to initialize HMAC: {e}.") })?;

	mac.update(message);

	Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn sha256_is_deterministic() {
		assert_eq!(sha256(b"hello"), sha256(b"hello"));
		assert_ne!(sha256(b"hello"), sha256(b"world"));
	}

	#[test]
	fn random_bytes_returns_requested_length() {
		assert_eq!(random_bytes(32).len(), 32);
	}

	#[test]
	fn rsa_roundtrip_signs_and_extracts_modulus() {
		let (public_pem, private_pem) =
			generate_rsa_3072().expect("Failed to generate RSA fixture key pair.");
		let signature = rsa_sign_pss_sha256(&private_pem, b"payload")
			.expect("Failed to sign fixture payload.");

		assert!(!signature.is_empty());

		let (modulus, exponent) =
			modulus_and_exponent(&public_pem).expect("Failed to extract modulus/exponent.");

		assert!(!modulus.is_empty());
		assert!(!exponent.is_empty());
	}

	#[test]
	fn hmac_sha256_is_deterministic_per_key() {
		let a = hmac_sha256(b"secret", b"payload").expect("HMAC should succeed.");
		let b = hmac_sha256(b"secret", b"payload").expect("HMAC should succeed.");

		assert_eq!(a, b);
	}
}
