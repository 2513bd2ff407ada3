//! JSON wire shapes for the registration and token endpoints.

// self
use crate::_prelude::*;

#[derive(Serialize)]
pub(super) struct Jwk {
	pub(super) kty: &'static str,
	pub(super) kid: String,
	pub(super) n: String,
	pub(super) e: String,
	pub(super) alg: &'static str,
	#[serde(rename = "use")]
	pub(super) usage: &'static str,
}

#[derive(Serialize)]
pub(super) struct JwkSet {
	pub(super) keys: Vec<Jwk>,
}

#[derive(Serialize)]
pub(super) struct RegistrationRequest {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub(super) client_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub(super) jwks: Option<JwkSet>,
}

#[derive(Deserialize)]
pub(super) struct RegistrationResponse {
	pub(super) client_id: String,
	#[serde(default)]
	pub(super) client_secret: Option<String>,
	pub(super) registration_access_token: String,
	pub(super) registration_client_uri: Url,
}

#[derive(Deserialize)]
pub(super) struct TokenResponse {
	pub(super) access_token: String,
}
