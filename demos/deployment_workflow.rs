//! Demonstrates onboarding against a mock platform and patching a deployment-workflow
//! instance into its `DOWNLOADED` state.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use mindconnect::{
	_preludet::*,
	config::{AgentConfig, SecurityProfile},
	deployment::DeploymentsContext,
	identity::{IdentityContext, MemoryCredentialStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let register_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201).header("content-type", "application/json").body(
				r#"{"client_id":"demo-agent","client_secret":"demo-secret","registration_access_token":"rat-demo","registration_client_uri":"https://southgate.example.com/register/demo-agent"}"#,
			);
		})
		.await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.header("server-time", "2024-01-01T00:00:00Z")
				.body(r#"{"access_token":"demo-access-token","expires_in":3600}"#);
		})
		.await;
	let workflow_id = "1a5f74ef-0000-0000-0000-000000000000";
	let patch_mock = server
		.mock_async(|when, then| {
			when.method(PATCH).path(format!("/api/deploymentworkflow/v3/instances/{workflow_id}"));
			then.status(200).header("content-type", "application/json").body(format!(
				r#"{{"id":"{workflow_id}","deviceId":"device-1","createdAt":"2024-01-01T00:00:00Z","currentState":{{"state":"DOWNLOADED","progress":1.0,"message":"Completed"}}}}"#
			));
		})
		.await;
	let base = Url::parse(&server.base_url())?;
	let config = AgentConfig::builder(base.clone(), SecurityProfile::Shared)
		.tenant("demo-tenant")
		.enrollment_endpoint(base.join("/register")?)
		.token_endpoint(base.join("/token")?)
		.enrollment_token("IAT-demo")
		.build()?;
	let store = Arc::new(MemoryCredentialStore::default());
	let identity = IdentityContext::with_http_engine(config, test_reqwest_http_engine(), store)?;

	identity.register().await?;
	identity.get_access_token().await?;

	let deployments = DeploymentsContext::new(&identity);
	let workflow =
		deployments
			.update(workflow_id, "DOWNLOADED", "Completed", Some(1.0), None, None)
			.await?;

	println!("Workflow {} is now {}.", workflow.id, workflow.current_state.state);

	register_mock.assert_async().await;
	token_mock.assert_async().await;
	patch_mock.assert_async().await;

	Ok(())
}
