//! Translates [`ProxyConfig`] into a `reqwest::Proxy`.

// self
use crate::{_prelude::*, config::{ProxyConfig, ProxyKind}};

/// Builds a `reqwest::Proxy` for the configured forward proxy.
pub(super) fn build_proxy(config: &ProxyConfig) -> Result<reqwest::Proxy> {
	let scheme = match config.kind {
		ProxyKind::Http => "http",
		ProxyKind::Https => "https",
		ProxyKind::Socks4 => "socks4",
		ProxyKind::Socks4a => "socks4a",
		ProxyKind::Socks5 => "socks5",
		ProxyKind::Socks5Hostname => "socks5h",
	};
	let url = format!("{scheme}://{}:{}", config.host, config.port);
	let mut proxy = reqwest::Proxy::all(&url)
		.map_err(|e| Error::InvalidParameter {
			parameter: "proxy",
			reason: format!("could not build proxy URL: {e}"),
		})?;

	if let (Some(username), Some(password)) =
		(config.auth_username(), config.password.as_deref())
	{
		proxy = proxy.basic_auth(&username, password);
	}

	Ok(proxy)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn build_proxy_accepts_socks5_hostname() {
		let config = ProxyConfig {
			host: "proxy.example.com".into(),
			port: 1080,
			kind: ProxyKind::Socks5Hostname,
			username: None,
			password: None,
			domain: None,
		};

		build_proxy(&config).expect("SOCKS5-hostname proxy should build.");
	}
}
