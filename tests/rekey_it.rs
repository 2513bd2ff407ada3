// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use mindconnect::{
	_preludet::*,
	config::{AgentConfig, SecurityProfile},
	identity::{IdentityContext, MemoryCredentialStore},
};

#[tokio::test]
async fn a_rejected_token_request_can_be_recovered_with_rotate_key() {
	let server = MockServer::start_async().await;
	let registration_uri = server.url("/register");
	let register_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201).header("content-type", "application/json").body(format!(
				r#"{{"client_id":"zxc","client_secret":"dummy_secret","registration_access_token":"123","registration_client_uri":"{registration_uri}"}}"#
			));
		})
		.await;
	let base = Url::parse(&server.base_url()).expect("Base URL should parse.");
	let config = AgentConfig::builder(base.clone(), SecurityProfile::Shared)
		.tenant("br-smk1")
		.enrollment_endpoint(base.join("/register").expect("Enrollment path should parse."))
		.token_endpoint(base.join("/token").expect("Token path should parse."))
		.enrollment_token("IAT-xyz")
		.build()
		.expect("Config should build.");
	let store = Arc::new(MemoryCredentialStore::default());
	let identity = IdentityContext::with_http_engine(config, test_reqwest_http_engine(), store)
		.expect("Context should construct.");

	identity.register().await.expect("Initial registration should succeed.");

	// First token attempt: the server rejects the current secret with 400, the documented
	// trigger for a rekey.
	let first_token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_client"}"#);
		})
		.await;
	let err =
		identity.get_access_token().await.expect_err("Stale secret must be rejected with 400.");

	assert!(matches!(err, Error::BadRequest { .. }));

	first_token_mock.assert_calls_async(1).await;
	register_mock.assert_calls_async(1).await;

	// Rekey issues a new secret against the relocated registration URI. httpmock resolves an
	// incoming request against the most recently created matching mock, so this takes over
	// from `register_mock` for any further `/register` call without needing to remove it.
	let rekey_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(200).header("content-type", "application/json").body(format!(
				r#"{{"client_id":"zxc","client_secret":"rotated_secret","registration_access_token":"123","registration_client_uri":"{registration_uri}"}}"#
			));
		})
		.await;

	identity.rotate_key().await.expect("Rekey should succeed.");

	rekey_mock.assert_calls_async(1).await;

	// Retrying with the rotated secret succeeds.
	let second_token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.header("server-time", "2024-01-01T00:00:00Z")
				.body(r#"{"access_token":"eyJraWQiOi...","expires_in":3600}"#);
		})
		.await;

	identity.get_access_token().await.expect("Token fetch after rekey should succeed.");

	second_token_mock.assert_calls_async(1).await;
	assert_eq!(identity.get_last_access_token().unwrap().expose(), "eyJraWQiOi...");
}
