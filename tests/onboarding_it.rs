// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use mindconnect::{
	_preludet::*,
	config::{AgentConfig, SecurityProfile, TrustRoot},
	error::TransportError,
	identity::{CredentialPersistence, IdentityContext, MemoryCredentialStore, SecretMaterial},
};

fn build_config(server: &MockServer) -> Result<AgentConfig> {
	let base = Url::parse(&server.base_url())?;

	Ok(AgentConfig::builder(base.clone(), SecurityProfile::Shared)
		.tenant("br-smk1")
		.enrollment_endpoint(base.join("/register")?)
		.token_endpoint(base.join("/token")?)
		.enrollment_token("IAT-xyz")
		.build()?)
}

#[tokio::test]
async fn shared_secret_onboarding_persists_the_registration_response() {
	let server = MockServer::start_async().await;
	let register_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201).header("content-type", "application/json").body(
				r#"{"client_id":"zxc","client_secret":"dummy_secret","registration_access_token":"123","registration_client_uri":"https://h/register"}"#,
			);
		})
		.await;
	let store = Arc::new(MemoryCredentialStore::default());
	let identity = IdentityContext::with_http_engine(
		build_config(&server).expect("Config should build."),
		test_reqwest_http_engine(),
		store.clone(),
	)
	.expect("Context should construct in Configured state.");

	assert!(!identity.is_onboarded());

	identity.register().await.expect("Initial registration should succeed.");

	register_mock.assert_async().await;
	assert!(identity.is_onboarded());

	let saved = store
		.load()
		.expect("Load should succeed.")
		.expect("A record should have been saved by register().");

	assert_eq!(saved.client_id, "zxc");
	assert_eq!(saved.registration_access_token, "123");
	assert_eq!(saved.registration_uri.as_str(), "https://h/register");
	assert!(matches!(saved.material, SecretMaterial::Shared { client_secret } if client_secret == "dummy_secret"));
}

#[tokio::test]
async fn second_register_on_an_onboarded_identity_is_rejected_without_network_traffic() {
	let server = MockServer::start_async().await;
	let register_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201).header("content-type", "application/json").body(
				r#"{"client_id":"zxc","client_secret":"dummy_secret","registration_access_token":"123","registration_client_uri":"https://h/register"}"#,
			);
		})
		.await;
	let store = Arc::new(MemoryCredentialStore::default());
	let identity = IdentityContext::with_http_engine(
		build_config(&server).expect("Config should build."),
		test_reqwest_http_engine(),
		store,
	)
	.expect("Context should construct.");

	identity.register().await.expect("Initial registration should succeed.");

	register_mock.assert_calls_async(1).await;

	let err = identity.register().await.expect_err("Second register must be rejected.");

	assert!(matches!(err, Error::AlreadyOnboarded));

	// No additional request was dispatched for the rejected call.
	register_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn improper_trust_root_is_rejected_before_any_network_io() {
	let server = MockServer::start_async().await;
	let register_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201);
		})
		.await;
	let mut config = build_config(&server).expect("Config should build.");

	config.trust_roots.push(TrustRoot::Pem("not a certificate".into()));

	// An invalid PEM trust root is rejected while composing the TLS-backed engine, before
	// any request is attempted.
	let err = mindconnect::http::ReqwestHttpEngine::new(&config)
		.expect_err("Malformed trust root must be rejected before any request is attempted.");

	assert!(matches!(err, Error::Transport(TransportError::ImproperCertificate)));

	register_mock.assert_calls_async(0).await;
}
