//! The identity record: the durable half of an agent's credentials.
//!
//! Deliberately excludes the volatile `access_token`/`last_token_server_time` fields—
//! those live only in [`super::context::IdentityContext`], since the persistence
//! callback contract never sees them (see DESIGN.md).

// self
use crate::_prelude::*;

/// Bearer access token, redacted in `Debug`/`Display` so it never leaks into logs.
#[derive(Clone)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a raw bearer string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw bearer string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AccessToken(<redacted>)")
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Profile-specific signing material, the sum half of the identity record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SecretMaterial {
	/// Shared-secret profile: an HMAC key rotated by the server on every register call.
	Shared {
		/// Current client secret.
		client_secret: String,
	},
	/// Asymmetric-key profile: an RSA-3072 key pair rotated on every register call.
	Rsa {
		/// PEM-encoded public key.
		public_key_pem: String,
		/// PEM-encoded PKCS#8 private key.
		private_key_pem: String,
	},
}

/// The durable identity record, populated by registration and reconciled by
/// `update_credentials`.
///
/// "Onboarded" is exactly "an `IdentityRecord` exists"—see
/// [`super::context::IdentityState`] for the states before onboarding completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
	/// Agent-identifying client id assigned by the platform.
	pub client_id: String,
	/// Profile-specific signing material.
	pub material: SecretMaterial,
	/// Long-lived bearer used to rekey.
	pub registration_access_token: String,
	/// Registration URI; once received, overrides the configured enrollment endpoint for
	/// all subsequent rekey calls.
	pub registration_uri: Url,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn access_token_debug_is_redacted() {
		let token = AccessToken::new("super-secret");

		assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
		assert_eq!(token.expose(), "super-secret");
	}
}
