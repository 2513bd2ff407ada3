//! Edge-agent client for industrial IoT platforms—onboarding, self-issued access tokens,
//! chunked uploads, and deployment workflows in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod compose;
pub mod config;
pub mod deployment;
pub mod error;
pub mod http;
pub mod identity;
pub mod jwt;
pub mod obs;
pub mod security;
pub mod upload;

#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::AgentConfig,
		http::ReqwestHttpEngine,
		identity::{IdentityContext, MemoryCredentialStore},
	};

	/// Identity context type alias used by reqwest-backed integration tests.
	pub type ReqwestTestIdentity = IdentityContext<ReqwestHttpEngine>;

	/// Builds a reqwest HTTP engine that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_engine() -> ReqwestHttpEngine {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure reqwest client for tests.");

		ReqwestHttpEngine::with_client(client)
	}

	/// Constructs an [`IdentityContext`] backed by an in-memory credential store and the
	/// reqwest transport used across integration tests.
	pub fn build_reqwest_test_identity(config: AgentConfig) -> Result<ReqwestTestIdentity> {
		let store = Arc::new(MemoryCredentialStore::default());

		IdentityContext::with_http_engine(config, test_reqwest_http_engine(), store)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
