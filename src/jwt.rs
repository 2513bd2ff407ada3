//! Construction of the self-issued, time-bounded authorization grant.
//!
//! The access-token flow (`identity::context`) builds one of these JWTs per token
//! request and presents it as the `client_assertion`-style bearer. See the GLOSSARY entry
//! for "Access token" for the distinction from the registration access token.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, config::SecurityProfile, security};

/// Fixed lifetime of every issued grant, in seconds.
pub const GRANT_LIFETIME_SECONDS: i64 = 86_400;

/// The fixed schema URI embedded in every grant's claims.
const SCHEMA_URI: &str = "urn:siemens:mindsphere:v1";

/// Injectable source of the current time, so tests can assert exact `iat`/`exp` values.
pub trait Clock: Send + Sync {
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// [`Clock`] that always returns a fixed instant; used by tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub OffsetDateTime);
impl Clock for FixedClock {
	fn now(&self) -> OffsetDateTime {
		self.0
	}
}

#[derive(Serialize)]
struct Header<'a> {
	typ: &'static str,
	alg: &'static str,
	kid: &'a str,
}

#[derive(Serialize)]
struct Claims<'a> {
	iss: &'a str,
	sub: &'a str,
	aud: &'a str,
	iat: i64,
	nbf: i64,
	exp: i64,
	schemas: [&'static str; 1],
	ten: &'a str,
	jti: String,
}

/// Key material used to sign a grant, one variant per [`SecurityProfile`].
pub enum SigningKey<'a> {
	/// HMAC-SHA256 over the client secret.
	Shared {
		/// The agent's current client secret.
		client_secret: &'a str,
	},
	/// RSA-PSS/SHA-256 over the agent's private key.
	Rsa {
		/// PEM-encoded PKCS#8 private key.
		private_key_pem: &'a str,
	},
}
impl<'a> SigningKey<'a> {
	fn alg(&self) -> &'static str {
		match self {
			SigningKey::Shared { .. } => "HS256",
			SigningKey::Rsa { .. } => "RS256",
		}
	}

	fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>> {
		match self {
			SigningKey::Shared { client_secret } =>
				security::hmac_sha256(client_secret.as_bytes(), signing_input),
			SigningKey::Rsa { private_key_pem } =>
				security::rsa_sign_pss_sha256(private_key_pem, signing_input),
		}
	}
}

/// Builds and signs the compact-serialization JWT presented as the access-token grant.
///
/// `client_id` becomes both `iss`/`sub` and the header's `kid`—the documented, authoritative
/// value, not the literal placeholder seen in some upstream fixtures (see DESIGN.md).
pub fn build_grant(
	client_id: &str,
	tenant: &str,
	platform_audience: &str,
	key: &SigningKey<'_>,
	clock: &dyn Clock,
) -> Result<String> {
	let now = clock.now();
	let iat = now.unix_timestamp();
	let header = Header { typ: "JWT", alg: key.alg(), kid: client_id };
	let claims = Claims {
		iss: client_id,
		sub: client_id,
		aud: platform_audience,
		iat,
		nbf: iat,
		exp: iat + GRANT_LIFETIME_SECONDS,
		schemas: [SCHEMA_URI],
		ten: tenant,
		jti: random_jti(),
	};
	let header_b64 = URL_SAFE_NO_PAD.encode(
		serde_json::to_vec(&header)
			.map_err(|e| Error::Fail { reason: format!("Failed to encode JWT header: {e}.") })?,
	);
	let claims_b64 = URL_SAFE_NO_PAD.encode(
		serde_json::to_vec(&claims)
			.map_err(|e| Error::Fail { reason: format!("Failed to encode JWT claims: {e}.") })?,
	);
	let signing_input = format!("{header_b64}.{claims_b64}");
	let signature = key.sign(signing_input.as_bytes())?;
	let signature_b64 = URL_SAFE_NO_PAD.encode(signature);

	Ok(format!("{signing_input}.{signature_b64}"))
}

fn random_jti() -> String {
	URL_SAFE_NO_PAD.encode(security::random_bytes(16))
}

/// Returns the profile-appropriate signing algorithm label, exposed for callers that
/// validate header fields without decoding the full grant.
pub const fn alg_for(profile: SecurityProfile) -> &'static str {
	match profile {
		SecurityProfile::Shared => "HS256",
		SecurityProfile::Rsa3072 => "RS256",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn decode_segment(segment: &str) -> serde_json::Value {
		let bytes = URL_SAFE_NO_PAD.decode(segment).expect("JWT segment should be valid base64url.");

		serde_json::from_slice(&bytes).expect("JWT segment should be valid JSON.")
	}

	#[test]
	fn shared_profile_grant_has_expected_header_and_claims() {
		let clock = FixedClock(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
		let key = SigningKey::Shared { client_secret: "dummy_secret" };
		let token = build_grant("zxc", "br-smk1", "https://platform.example", &key, &clock)
			.expect("Grant should build successfully.");
		let parts: Vec<_> = token.split('.').collect();

		assert_eq!(parts.len(), 3);

		let header = decode_segment(parts[0]);
		let claims = decode_segment(parts[1]);

		assert_eq!(header["alg"], "HS256");
		assert_eq!(header["kid"], "zxc");
		assert_eq!(claims["iss"], "zxc");
		assert_eq!(claims["sub"], "zxc");
		assert_eq!(claims["ten"], "br-smk1");
		assert_eq!(claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(), 86_400);
	}

	#[test]
	fn rsa_profile_grant_is_verifiable_with_the_signing_key() {
		let (_, private_pem) =
			security::generate_rsa_3072().expect("Failed to generate fixture RSA key pair.");
		let clock = FixedClock(OffsetDateTime::now_utc());
		let key = SigningKey::Rsa { private_key_pem: &private_pem };
		let token = build_grant("agent-1", "tenant-1", "https://platform.example", &key, &clock)
			.expect("Grant should build successfully.");

		assert_eq!(token.split('.').count(), 3);
	}
}
