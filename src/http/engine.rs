//! reqwest-backed [`HttpEngine`] implementation.

// std
use std::{fs, pin::Pin, task::{Context, Poll}};
// crates.io
use bytes::Bytes;
use futures_core::Stream;
use reqwest::tls::Version as TlsVersion;
// self
use super::proxy::build_proxy;
use crate::{
	_prelude::*,
	config::{AgentConfig, TrustRoot},
	error::TransportError,
	http::{Body, BodyProducer, EngineFuture, HttpEngine, HttpRequest, HttpResponse, Method},
};

/// reqwest-backed [`HttpEngine`].
///
/// One `reqwest::Client` is built per engine instance and reused for every `send` call;
/// "never reuse a connection" is satisfied by disabling the idle-connection pool and
/// sending `Connection: close` on every request rather than rebuilding the client.
#[derive(Clone)]
pub struct ReqwestHttpEngine(ReqwestClient);
impl ReqwestHttpEngine {
	/// Builds an engine from the agent configuration, composing trust roots, proxy, and
	/// timeout.
	pub fn new(config: &AgentConfig) -> Result<Self> {
		let mut builder = ReqwestClient::builder()
			.min_tls_version(TlsVersion::TLS_1_2)
			.pool_max_idle_per_host(0)
			.timeout(std::time::Duration::from_secs(
				config.request_timeout.whole_seconds().max(0) as u64,
			));

		builder = Self::install_trust_roots(builder, &config.trust_roots)?;

		if let Some(proxy) = &config.proxy {
			builder = builder.proxy(build_proxy(proxy)?);
		}

		let client = builder
			.build()
			.map_err(|e| Error::InvalidParameter {
				parameter: "trust_roots/proxy",
				reason: format!("failed to build HTTP client: {e}"),
			})?;

		Ok(Self(client))
	}

	/// Wraps an already-built client, for tests that need to accept self-signed mock-server
	/// certificates.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn install_trust_roots(
		mut builder: reqwest::ClientBuilder,
		roots: &[TrustRoot],
	) -> Result<reqwest::ClientBuilder> {
		for root in roots {
			let pem = match root {
				TrustRoot::Pem(text) => text.clone(),
				TrustRoot::Path(path) => fs::read_to_string(path).map_err(|_| {
					Error::Transport(TransportError::ImproperCertificate)
				})?,
			};
			let certificate = reqwest::Certificate::from_pem(pem.as_bytes())
				.map_err(|_| Error::Transport(TransportError::ImproperCertificate))?;

			builder = builder.add_root_certificate(certificate);
		}

		Ok(builder)
	}
}
impl HttpEngine for ReqwestHttpEngine {
	fn send<'a>(&'a self, request: HttpRequest) -> EngineFuture<'a, HttpResponse> {
		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
			};
			let mut builder = self.0.request(method, request.url).header("Connection", "close");

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}

			builder = match request.body {
				Body::Empty => builder,
				Body::Bytes(bytes) => builder.body(bytes),
				Body::Stream { producer, known_length: Some(_) } =>
					builder.body(drain_producer(producer)?),
				Body::Stream { producer, known_length: None } =>
					builder.header("Transfer-Encoding", "chunked").body(reqwest::Body::wrap_stream(
						ProducerStream(producer),
					)),
			};

			let response =
				builder.send().await.map_err(|e| Error::Transport(TransportError::from(e)))?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_owned()))
				.collect();
			let body = response
				.bytes()
				.await
				.map_err(|e| Error::Transport(TransportError::from(e)))?
				.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}

fn drain_producer(mut producer: Box<dyn BodyProducer>) -> Result<Vec<u8>> {
	let mut buf = Vec::new();

	while let Some(chunk) = producer.next_chunk()? {
		buf.extend_from_slice(&chunk);
	}

	Ok(buf)
}

struct ProducerStream(Box<dyn BodyProducer>);
impl Stream for ProducerStream {
	type Item = std::result::Result<Bytes, std::io::Error>;

	fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		match self.0.next_chunk() {
			Ok(Some(chunk)) => Poll::Ready(Some(Ok(Bytes::from(chunk)))),
			Ok(None) => Poll::Ready(None),
			Err(e) => Poll::Ready(Some(Err(std::io::Error::other(e.to_string())))),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::SecurityProfile;

	fn endpoint_base() -> Url {
		Url::parse("https://southgate.example.com").unwrap()
	}

	#[test]
	fn new_builds_client_with_valid_config() {
		let config = AgentConfig::builder(endpoint_base(), SecurityProfile::Shared)
			.tenant("tenant-1")
			.enrollment_endpoint(endpoint_base().join("/register").unwrap())
			.token_endpoint(endpoint_base().join("/token").unwrap())
			.build()
			.expect("Config should build.");

		ReqwestHttpEngine::new(&config).expect("Engine should build with no trust roots.");
	}

	#[test]
	fn new_rejects_malformed_trust_root() {
		let config = AgentConfig::builder(endpoint_base(), SecurityProfile::Shared)
			.tenant("tenant-1")
			.enrollment_endpoint(endpoint_base().join("/register").unwrap())
			.token_endpoint(endpoint_base().join("/token").unwrap())
			.trust_root(TrustRoot::Pem("not a certificate".into()))
			.build()
			.expect("Config should build.");
		let err = ReqwestHttpEngine::new(&config)
			.expect_err("Malformed trust root must surface IMPROPER_CERTIFICATE.");

		assert!(matches!(err, Error::Transport(TransportError::ImproperCertificate)));
	}
}
