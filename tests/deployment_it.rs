// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use mindconnect::{
	_preludet::*,
	config::{AgentConfig, SecurityProfile},
	deployment::{DeploymentsContext, WorkflowFilter},
	identity::{IdentityContext, MemoryCredentialStore},
};

async fn onboarded_identity(server: &MockServer) -> ReqwestTestIdentity {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201).header("content-type", "application/json").body(
				r#"{"client_id":"zxc","client_secret":"dummy_secret","registration_access_token":"123","registration_client_uri":"https://h/register"}"#,
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.header("server-time", "2024-01-01T00:00:00Z")
				.body(r#"{"access_token":"eyJraWQiOi...","expires_in":3600}"#);
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

	identity.register().await.expect("Registration should succeed.");
	identity.get_access_token().await.expect("Token fetch should succeed.");

	identity
}

#[tokio::test]
async fn update_patches_a_workflow_instance_and_returns_its_new_state() {
	let server = MockServer::start_async().await;
	let identity = onboarded_identity(&server).await;
	let workflow_id = "1a5f74ef-0000-0000-0000-000000000000";
	let patch_mock = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path(format!("/api/deploymentworkflow/v3/instances/{workflow_id}"))
				.json_body_partial(r#"{"state":"DOWNLOADED","progress":1.0,"message":"Completed"}"#);
			then.status(200).header("content-type", "application/json").body(format!(
				r#"{{"id":"{workflow_id}","deviceId":"device-1","createdAt":"2024-01-01T00:00:00Z","currentState":{{"state":"DOWNLOADED","progress":1.0,"message":"Completed"}}}}"#
			));
		})
		.await;
	let deployments = DeploymentsContext::new(&identity);
	let workflow = deployments
		.update(workflow_id, "DOWNLOADED", "Completed", Some(1.0), None, None)
		.await
		.expect("Patch should succeed.");

	patch_mock.assert_async().await;
	assert_eq!(workflow.id, workflow_id);
	assert_eq!(workflow.current_state.state, "DOWNLOADED");
	assert_eq!(workflow.current_state.progress, 1.0);
	assert_eq!(workflow.current_state.message, "Completed");
}

#[tokio::test]
async fn list_composes_the_query_string_from_the_filter() {
	let server = MockServer::start_async().await;
	let identity = onboarded_identity(&server).await;
	let list_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/deploymentworkflow/v3/instances")
				.query_param("model", "true")
				.query_param("device_id", "device-1");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"id":"wf-1","deviceId":"device-1","createdAt":"2024-01-01T00:00:00Z","currentState":{"state":"PENDING","progress":0.0,"message":""}}]"#);
		})
		.await;
	let deployments = DeploymentsContext::new(&identity);
	let filter = WorkflowFilter::new().with_model().device_id("device-1");
	let workflows = deployments
		.list(Some(&filter))
		.await
		.expect("List should succeed.");

	list_mock.assert_async().await;
	assert_eq!(workflows.len(), 1);
	assert_eq!(workflows[0].device_id, "device-1");
}
