//! Immutable-after-build agent configuration.
//!
//! Replaces a dynamic, stringly-typed "set_parameter" surface with a typed builder whose
//! fields are the configuration's full parameter list; validation runs once, in
//! [`AgentConfigBuilder::build`].

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Lower bound of [`AgentConfigBuilder::max_http_payload_size`], in bytes.
pub const MIN_MAX_HTTP_PAYLOAD_SIZE: u32 = 400;
/// Upper bound of [`AgentConfigBuilder::max_http_payload_size`], in bytes.
pub const MAX_MAX_HTTP_PAYLOAD_SIZE: u32 = 10_485_760;
/// Default value of `max_http_payload_size` when unset.
pub const DEFAULT_MAX_HTTP_PAYLOAD_SIZE: u32 = 16_384;
/// Default platform port.
pub const DEFAULT_PLATFORM_PORT: u16 = 443;
/// Default HTTP request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: i64 = 300;

/// Security profile governing the identity's signing material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecurityProfile {
	/// HMAC-SHA256 over a server-issued client secret.
	Shared,
	/// RSA-3072 key pair, rotated on every rekey.
	Rsa3072,
}

/// Additional TLS trust root accepted alongside the platform's default trust store.
#[derive(Clone, Debug)]
pub enum TrustRoot {
	/// One or more concatenated PEM certificates held in memory.
	Pem(String),
	/// Filesystem path to a PEM bundle.
	Path(PathBuf),
}

/// Forward proxy kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProxyKind {
	/// Plain HTTP proxy.
	Http,
	/// HTTP proxy reached over TLS.
	Https,
	/// SOCKS4.
	Socks4,
	/// SOCKS4a (proxy resolves the hostname).
	Socks4a,
	/// SOCKS5.
	Socks5,
	/// SOCKS5 with proxy-side hostname resolution.
	Socks5Hostname,
}

/// Forward proxy configuration.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
	/// Proxy host.
	pub host: String,
	/// Proxy port.
	pub port: u16,
	/// Proxy protocol kind.
	pub kind: ProxyKind,
	/// Proxy-auth username.
	pub username: Option<String>,
	/// Proxy-auth password.
	pub password: Option<String>,
	/// Windows-style auth domain, composed into `domain\username` when present.
	pub domain: Option<String>,
}
impl ProxyConfig {
	/// Returns the composed proxy-auth user identifier, `domain\username` when a domain is
	/// configured, otherwise the bare username.
	pub fn auth_username(&self) -> Option<String> {
		let username = self.username.as_deref()?;

		match self.domain.as_deref() {
			Some(domain) => Some(format!("{domain}\\{username}")),
			None => Some(username.to_owned()),
		}
	}
}

/// Opaque critical-section guard capability used to bracket identity mutations when a
/// context may be shared across threads of control.
pub trait CriticalSection: Send + Sync {
	/// Acquires the section; blocks the calling thread until available.
	fn enter(&self);
	/// Releases the section.
	fn leave(&self);
}

/// Immutable configuration shared by the identity, uploads, and deployments contexts.
#[derive(Clone)]
pub struct AgentConfig {
	/// Platform base URL (scheme + host), e.g. `https://southgate.eu1.mindsphere.io`.
	pub platform_base_url: Url,
	/// Platform port.
	pub platform_port: u16,
	/// Initial registration endpoint; superseded by the server-relocated
	/// `registration_uri` on every subsequent rekey.
	pub enrollment_endpoint: Url,
	/// Access-token endpoint.
	pub token_endpoint: Url,
	/// Additional TLS trust roots.
	pub trust_roots: Vec<TrustRoot>,
	/// Optional forward proxy.
	pub proxy: Option<ProxyConfig>,
	/// User-Agent comment appended after the library's own product token.
	pub user_agent_comment: String,
	/// Tenant identifier embedded in the JWT grant.
	pub tenant: String,
	/// Security profile governing signing material.
	pub security_profile: SecurityProfile,
	/// One-shot bearer used only for the very first registration.
	pub enrollment_token: Option<String>,
	/// Optional critical-section capability bracketing register/rekey/update_credentials.
	pub critical_section: Option<Arc<dyn CriticalSection>>,
	/// HTTP request timeout (connect + total transfer).
	pub request_timeout: Duration,
	/// Maximum payload size honored by the upload assembler, in bytes.
	pub max_http_payload_size: u32,
}
impl AgentConfig {
	/// Starts a new builder for the given platform base URL and security profile.
	pub fn builder(platform_base_url: Url, security_profile: SecurityProfile) -> AgentConfigBuilder {
		AgentConfigBuilder::new(platform_base_url, security_profile)
	}
}

/// Fluent, validated builder for [`AgentConfig`].
pub struct AgentConfigBuilder {
	platform_base_url: Url,
	platform_port: u16,
	enrollment_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	trust_roots: Vec<TrustRoot>,
	proxy: Option<ProxyConfig>,
	user_agent_comment: String,
	tenant: Option<String>,
	security_profile: SecurityProfile,
	enrollment_token: Option<String>,
	critical_section: Option<Arc<dyn CriticalSection>>,
	request_timeout: Duration,
	max_http_payload_size: u32,
}
impl AgentConfigBuilder {
	fn new(platform_base_url: Url, security_profile: SecurityProfile) -> Self {
		Self {
			platform_base_url,
			platform_port: DEFAULT_PLATFORM_PORT,
			enrollment_endpoint: None,
			token_endpoint: None,
			trust_roots: Vec::new(),
			proxy: None,
			user_agent_comment: String::new(),
			tenant: None,
			security_profile,
			enrollment_token: None,
			critical_section: None,
			request_timeout: Duration::seconds(DEFAULT_REQUEST_TIMEOUT_SECONDS),
			max_http_payload_size: DEFAULT_MAX_HTTP_PAYLOAD_SIZE,
		}
	}

	/// Overrides the platform port; default 443.
	pub fn platform_port(mut self, port: u16) -> Self {
		self.platform_port = port;
		self
	}

	/// Sets the initial registration endpoint.
	pub fn enrollment_endpoint(mut self, url: Url) -> Self {
		self.enrollment_endpoint = Some(url);
		self
	}

	/// Sets the access-token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);
		self
	}

	/// Adds a TLS trust root.
	pub fn trust_root(mut self, root: TrustRoot) -> Self {
		self.trust_roots.push(root);
		self
	}

	/// Configures a forward proxy.
	pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
		self.proxy = Some(proxy);
		self
	}

	/// Sets the User-Agent comment appended to the library's product token.
	pub fn user_agent_comment(mut self, comment: impl Into<String>) -> Self {
		self.user_agent_comment = comment.into();
		self
	}

	/// Sets the tenant identifier.
	pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
		self.tenant = Some(tenant.into());
		self
	}

	/// Sets the one-shot enrollment token used for the first registration.
	pub fn enrollment_token(mut self, token: impl Into<String>) -> Self {
		self.enrollment_token = Some(token.into());
		self
	}

	/// Installs a critical-section capability for concurrent identity mutation.
	pub fn critical_section(mut self, section: Arc<dyn CriticalSection>) -> Self {
		self.critical_section = Some(section);
		self
	}

	/// Overrides the HTTP request timeout; default 300 seconds.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	/// Overrides the maximum upload payload size; must fall in
	/// `[MIN_MAX_HTTP_PAYLOAD_SIZE, MAX_MAX_HTTP_PAYLOAD_SIZE]`.
	pub fn max_http_payload_size(mut self, size: u32) -> Self {
		self.max_http_payload_size = size;
		self
	}

	/// Validates and finalizes the configuration.
	pub fn build(self) -> Result<AgentConfig> {
		if !(MIN_MAX_HTTP_PAYLOAD_SIZE..=MAX_MAX_HTTP_PAYLOAD_SIZE)
			.contains(&self.max_http_payload_size)
		{
			return Err(Error::InvalidParameter {
				parameter: "max_http_payload_size",
				reason: format!(
					"must be between {MIN_MAX_HTTP_PAYLOAD_SIZE} and {MAX_MAX_HTTP_PAYLOAD_SIZE}, got {}",
					self.max_http_payload_size
				),
			});
		}

		let tenant = self.tenant.ok_or(Error::TriggeredWithNull { argument: "tenant" })?;
		let enrollment_endpoint = self
			.enrollment_endpoint
			.ok_or(Error::TriggeredWithNull { argument: "enrollment_endpoint" })?;
		let token_endpoint =
			self.token_endpoint.ok_or(Error::TriggeredWithNull { argument: "token_endpoint" })?;

		if self.platform_base_url.scheme() != "https" {
			return Err(Error::InvalidParameter {
				parameter: "platform_base_url",
				reason: "must use the https scheme".to_owned(),
			});
		}

		Ok(AgentConfig {
			platform_base_url: self.platform_base_url,
			platform_port: self.platform_port,
			enrollment_endpoint,
			token_endpoint,
			trust_roots: self.trust_roots,
			proxy: self.proxy,
			user_agent_comment: self.user_agent_comment,
			tenant,
			security_profile: self.security_profile,
			enrollment_token: self.enrollment_token,
			critical_section: self.critical_section,
			request_timeout: self.request_timeout,
			max_http_payload_size: self.max_http_payload_size,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base_url() -> Url {
		Url::parse("https://southgate.example.com").expect("Base URL should parse.")
	}

	#[test]
	fn build_rejects_payload_size_outside_bounds() {
		let err = AgentConfig::builder(base_url(), SecurityProfile::Shared)
			.tenant("tenant-1")
			.max_http_payload_size(399)
			.build()
			.expect_err("Payload size below the minimum must be rejected.");

		assert!(matches!(err, Error::InvalidParameter { parameter: "max_http_payload_size", .. }));
	}

	#[test]
	fn build_rejects_non_https_base_url() {
		let err = AgentConfig::builder(
			Url::parse("http://southgate.example.com").unwrap(),
			SecurityProfile::Shared,
		)
		.tenant("tenant-1")
		.enrollment_endpoint(base_url().join("/register").unwrap())
		.token_endpoint(base_url().join("/token").unwrap())
		.build()
		.expect_err("Non-HTTPS base URL must be rejected.");

		assert!(matches!(err, Error::InvalidParameter { parameter: "platform_base_url", .. }));
	}

	#[test]
	fn build_succeeds_with_defaults() {
		let config = AgentConfig::builder(base_url(), SecurityProfile::Rsa3072)
			.tenant("tenant-1")
			.enrollment_endpoint(base_url().join("/register").unwrap())
			.token_endpoint(base_url().join("/token").unwrap())
			.build()
			.expect("Minimal valid configuration should build.");

		assert_eq!(config.platform_port, DEFAULT_PLATFORM_PORT);
		assert_eq!(config.max_http_payload_size, DEFAULT_MAX_HTTP_PAYLOAD_SIZE);
	}

	#[test]
	fn proxy_auth_username_composes_domain() {
		let proxy = ProxyConfig {
			host: "proxy.example.com".into(),
			port: 3128,
			kind: ProxyKind::Http,
			username: Some("agent".into()),
			password: Some("secret".into()),
			domain: Some("CORP".into()),
		};

		assert_eq!(proxy.auth_username().as_deref(), Some("CORP\\agent"));
	}
}
