//! One-shot request/response transport used by every identity, upload, and deployment
//! call. See [`crate::compose`] for the layer that builds authenticated requests on top
//! of this engine.

#[cfg(feature = "reqwest")] mod engine;
#[cfg(feature = "reqwest")] mod proxy;

#[cfg(feature = "reqwest")] pub use engine::ReqwestHttpEngine;

// self
use crate::_prelude::*;

/// HTTP method used by an outbound request. The engine never issues DELETE or HEAD;
/// callers needing those are out of scope for this client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// GET.
	Get,
	/// POST.
	Post,
	/// PUT.
	Put,
	/// PATCH.
	Patch,
}
impl Method {
	/// Returns the wire method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
		}
	}
}

/// Pull-style producer of request-body chunks, used for streaming uploads.
///
/// Implementations read synchronously (typically from disk); the engine drains them one
/// chunk at a time rather than buffering the whole body in memory.
pub trait BodyProducer: Send {
	/// Returns the next chunk, or `None` once exhausted.
	fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Request body.
pub enum Body {
	/// No body (GET).
	Empty,
	/// A fully materialized, known-length body.
	Bytes(Vec<u8>),
	/// A streamed body sourced from a [`BodyProducer`], with an optional known length.
	///
	/// When `known_length` is `None` the engine sets `Transfer-Encoding: chunked`; when
	/// present, it sets `Content-Length` (the 64-bit variant is implicit since lengths are
	/// always `u64`).
	Stream {
		/// Chunk source.
		producer: Box<dyn BodyProducer>,
		/// Known total length, if any.
		known_length: Option<u64>,
	},
}
impl Debug for Body {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Body::Empty => f.write_str("Body::Empty"),
			Body::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
			Body::Stream { known_length, .. } =>
				write!(f, "Body::Stream(known_length = {known_length:?})"),
		}
	}
}

/// An outbound HTTP request.
#[derive(Debug)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Ordered header set; stable during `send`.
	pub headers: Vec<(String, String)>,
	/// Request body.
	pub body: Body,
}
impl HttpRequest {
	/// Builds a bodyless request (GET).
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), body: Body::Empty }
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	/// Sets a fully materialized body.
	pub fn with_bytes_body(mut self, bytes: Vec<u8>) -> Self {
		self.body = Body::Bytes(bytes);
		self
	}

	/// Sets a streamed body.
	pub fn with_stream_body(
		mut self,
		producer: Box<dyn BodyProducer>,
		known_length: Option<u64>,
	) -> Self {
		self.body = Body::Stream { producer, known_length };
		self
	}
}

/// Inbound HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// Status code.
	pub status: u16,
	/// Ordered response headers.
	pub headers: Vec<(String, String)>,
	/// Contiguous response payload.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Returns the first value of the named header (case-insensitive), if present.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}
}

/// Future returned by [`HttpEngine::send`].
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Abstraction over the HTTP transport. The only dependency the rest of the crate has on
/// a concrete HTTP stack, so tests can substitute a mock engine.
pub trait HttpEngine: Send + Sync + 'static {
	/// Sends `request`, returning the response or a [`crate::error::TransportError`].
	fn send<'a>(&'a self, request: HttpRequest) -> EngineFuture<'a, HttpResponse>;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn method_as_str_matches_wire_names() {
		assert_eq!(Method::Get.as_str(), "GET");
		assert_eq!(Method::Patch.as_str(), "PATCH");
	}

	#[test]
	fn response_header_lookup_is_case_insensitive() {
		let response = HttpResponse {
			status: 200,
			headers: vec![("Server-Time".into(), "2024-01-01T00:00:00Z".into())],
			body: Vec::new(),
		};

		assert_eq!(response.header("server-time"), Some("2024-01-01T00:00:00Z"));
	}
}
