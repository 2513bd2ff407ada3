//! Flat error taxonomy shared across identity, upload, and deployment flows.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by every public operation.
///
/// The core never retries autonomously; callers own the "refresh token / rekey / try
/// again" policy documented alongside [`crate::identity::IdentityContext`].
#[derive(Debug, ThisError)]
pub enum Error {
	// -- programmer errors --
	/// A required argument was null/empty where a value was mandatory.
	#[error("Argument `{argument}` must not be empty.")]
	TriggeredWithNull {
		/// Name of the offending argument.
		argument: &'static str,
	},
	/// An argument failed validation.
	#[error("Invalid parameter `{parameter}`: {reason}.")]
	InvalidParameter {
		/// Name of the offending parameter.
		parameter: &'static str,
		/// Human-readable reason.
		reason: String,
	},

	// -- resource errors --
	/// Allocation failed.
	#[error("Out of memory.")]
	OutOfMemory,
	/// A configured limit (e.g. max payload size) was exceeded.
	#[error("Limit exceeded: {reason}.")]
	LimitExceeded {
		/// Human-readable reason.
		reason: String,
	},

	// -- persistence errors --
	/// Neither an enrollment token nor loadable credentials were supplied.
	#[error("No enrollment token was provided and no credentials could be loaded.")]
	NoAccessTokenProvided,
	/// A configured load callback reported that nothing was stored.
	#[error("Credentials have not been loaded.")]
	CredentialsNotLoaded,
	/// A configured save callback failed after a successful network mutation.
	#[error("Credentials were not saved after a successful server response.")]
	CredentialsNotSaved,
	/// `update_credentials` found the backing store unchanged.
	#[error("Credentials are already up to date.")]
	CredentialsUpToDate,

	// -- lifecycle errors --
	/// `register()` was called on an already-onboarded identity in a context that forbids rekey.
	#[error("Identity is already onboarded.")]
	AlreadyOnboarded,
	/// An operation requiring onboarding was attempted before it completed.
	#[error("Identity has not completed onboarding.")]
	NotOnboarded,
	/// `get_last_access_token` was called before any access token was issued.
	#[error("No access token has been issued yet.")]
	NoAccessTokenExists,
	/// The token response carried no Server-Time header.
	#[error("Token response did not include a Server-Time header.")]
	NoServerTime,

	// -- transport errors --
	/// Transport-level failure (DNS, TCP, TLS, I/O).
	#[error(transparent)]
	Transport(#[from] TransportError),

	// -- server status errors --
	/// HTTP 400.
	#[error("Server rejected the request as malformed: {message}.")]
	BadRequest {
		/// Body excerpt or reason phrase, when available.
		message: String,
	},
	/// HTTP 401.
	#[error("Request was not authorized.")]
	Unauthorized,
	/// HTTP 403.
	#[error("Request was forbidden.")]
	Forbidden,
	/// HTTP 404.
	#[error("Resource was not found.")]
	NotFound,
	/// HTTP 409.
	#[error("Request conflicted with current server state.")]
	Conflict,
	/// HTTP 413.
	#[error("Upload payload exceeded the server's accepted size.")]
	RequestPayloadTooLarge,
	/// HTTP 429.
	#[error("Too many requests; retry after a backoff.")]
	TooManyRequests {
		/// Retry-After hint, if supplied.
		retry_after: Option<Duration>,
	},
	/// HTTP 5xx.
	#[error("Server reported an internal failure (status {status}).")]
	ServerFail {
		/// Raw HTTP status code.
		status: u16,
	},

	/// Catch-all for failures that do not fit a more specific category.
	#[error("{reason}")]
	Fail {
		/// Human-readable reason.
		reason: String,
	},
	/// A server response carried malformed JSON, or JSON of the wrong shape.
	#[error("Response body could not be parsed as the expected JSON shape.")]
	ResponseParse {
		/// Structured parsing failure, including the path into the document that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Parses `body` as `T`, wrapping any failure in [`Error::ResponseParse`] with the JSON
	/// path that failed rather than a flattened message.
	pub fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::ResponseParse { source })
	}
}

/// Transport-level failures (network, TLS, IO), surfaced exhaustively from [`crate::http`].
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The configured proxy host could not be resolved.
	#[error("Could not resolve proxy host.")]
	CouldNotResolveProxy,
	/// The target host could not be resolved.
	#[error("Could not resolve host.")]
	CouldNotResolveHost,
	/// A TCP connection to the host could not be established.
	#[error("Could not connect to host.")]
	CouldNotConnect,
	/// The TLS handshake failed.
	#[error("TLS handshake failed.")]
	SslHandshakeFail,
	/// The server certificate failed verification against the configured trust roots.
	#[error("Server certificate could not be verified.")]
	ServerCertificateNotVerified,
	/// A configured trust root was malformed.
	#[error("A configured trust root certificate is malformed.")]
	ImproperCertificate,
	/// The request could not be written to the socket.
	#[error("Failed to send request bytes.")]
	NetworkSendFail {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// The response could not be read from the socket.
	#[error("Failed to receive response bytes.")]
	NetworkReceiveFail {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// The request timed out (connect or total-transfer).
	#[error("Request timed out.")]
	RequestTimeout,
}
impl TransportError {
	/// Wraps a transport-specific send failure.
	pub fn network_send(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::NetworkSendFail { source: Box::new(src) }
	}

	/// Wraps a transport-specific receive failure.
	pub fn network_receive(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::NetworkReceiveFail { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::RequestTimeout
		} else if e.is_connect() {
			Self::CouldNotConnect
		} else if e.is_body() || e.is_decode() {
			Self::network_receive(e)
		} else {
			Self::network_send(e)
		}
	}
}

/// Maps a raw HTTP status code to the server-status branch of [`Error`].
///
/// `message` is used only for the 400 branch, where the caller benefits from the body
/// excerpt to decide whether a rekey is warranted.
pub fn map_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Error {
	match status {
		400 => Error::BadRequest { message: message.into() },
		401 => Error::Unauthorized,
		403 => Error::Forbidden,
		404 => Error::NotFound,
		409 => Error::Conflict,
		413 => Error::RequestPayloadTooLarge,
		429 => Error::TooManyRequests { retry_after },
		500..=599 => Error::ServerFail { status },
		_ => Error::Fail { reason: format!("Unexpected status {status}.") },
	}
}
