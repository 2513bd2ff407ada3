//! Builds authenticated requests and translates transport + status outcomes into the
//! error taxonomy. Every identity, upload, and deployment call routes through here before
//! reaching [`crate::http`].

// self
use crate::{_prelude::*, error, security};

/// Library product token sent as the first `User-Agent` segment.
const PRODUCT_TOKEN: &str = concat!("MCL/", env!("CARGO_PKG_VERSION"));

/// Bearer presented on a request, distinguishing the identity-plane tokens from the
/// short-lived data-plane access token.
pub enum Bearer<'a> {
	/// `Authorization: Bearer <access_token>`, for data-plane calls.
	AccessToken(&'a str),
	/// `Authorization: Bearer <enrollment_or_registration_token>`, for identity-plane calls.
	IdentityToken(&'a str),
}
impl<'a> Bearer<'a> {
	fn as_str(&self) -> &'a str {
		match self {
			Bearer::AccessToken(t) | Bearer::IdentityToken(t) => t,
		}
	}
}

/// Body content-type carried by an outbound request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
	/// `application/json`.
	Json,
	/// `application/x-www-form-urlencoded`.
	FormUrlEncoded,
	/// `application/octet-stream`.
	OctetStream,
	/// `multipart/mixed`, the deployment-upload envelope's wire type.
	MixedContent,
}
impl ContentType {
	/// Returns the MIME type string.
	pub const fn as_str(self) -> &'static str {
		match self {
			ContentType::Json => "application/json",
			ContentType::FormUrlEncoded => "application/x-www-form-urlencoded",
			ContentType::OctetStream => "application/octet-stream",
			ContentType::MixedContent => "multipart/mixed",
		}
	}
}

/// Common header set every outbound request carries, built by [`standard_headers`].
pub struct StandardHeaders {
	/// Ordered `(name, value)` pairs ready to attach to an [`crate::http::HttpRequest`].
	pub pairs: Vec<(String, String)>,
}

/// Builds the standard header set: `Authorization` (when `bearer` is supplied),
/// `User-Agent`, `Correlation-ID`, and optionally `Accept`/`Content-Type`.
///
/// `bearer` is `None` for the access-token request itself, whose JWT assertion carries
/// its own proof of identity rather than an `Authorization` header.
pub fn standard_headers(
	bearer: Option<Bearer<'_>>,
	user_agent_comment: &str,
	accept_json: bool,
	content_type: Option<ContentType>,
) -> StandardHeaders {
	let mut pairs = vec![
		("User-Agent".to_owned(), user_agent(user_agent_comment)),
		("Correlation-ID".to_owned(), correlation_id()),
	];

	if let Some(bearer) = bearer {
		pairs.insert(0, ("Authorization".to_owned(), format!("Bearer {}", bearer.as_str())));
	}

	if accept_json {
		pairs.push(("Accept".to_owned(), "application/json".to_owned()));
	}
	if let Some(content_type) = content_type {
		pairs.push(("Content-Type".to_owned(), content_type.as_str().to_owned()));
	}

	StandardHeaders { pairs }
}

fn user_agent(comment: &str) -> String {
	if comment.is_empty() {
		PRODUCT_TOKEN.to_owned()
	} else {
		format!("{PRODUCT_TOKEN} ({comment})")
	}
}

/// Generates a fresh 32-hex-character correlation token, one per request.
pub fn correlation_id() -> String {
	security::random_bytes(16).iter().map(|b| format!("{b:02x}")).collect()
}

/// Translates an [`crate::http::HttpResponse`] status into `Ok(response)` for 2xx, or the
/// corresponding [`crate::error::Error`] otherwise.
///
/// `message` should be a short excerpt of the response body, used only for the 400
/// branch where callers decide whether to rekey.
pub fn check_status(
	response: crate::http::HttpResponse,
	message_for_400: impl FnOnce(&crate::http::HttpResponse) -> String,
) -> Result<crate::http::HttpResponse> {
	if (200..300).contains(&response.status) {
		return Ok(response);
	}

	let retry_after = response
		.header("Retry-After")
		.and_then(|v| v.parse::<u64>().ok())
		.map(|secs| Duration::seconds(secs as i64));
	let message = if response.status == 400 { message_for_400(&response) } else { String::new() };

	Err(error::map_status(response.status, message, retry_after))
}
