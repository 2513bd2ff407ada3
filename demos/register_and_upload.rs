//! Demonstrates onboarding a shared-secret identity against a mock platform, fetching an
//! access token, and uploading a timeseries batch through the mixed-content envelope.

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
	identity::{IdentityContext, MemoryCredentialStore},
	upload::{DataPointValue, TimeseriesBatch, TimeseriesRecord, UploadsContext},
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
	let exchange_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/mindconnect/v3/exchange");
			then.status(201);
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

	let uploads = UploadsContext::new(&identity);
	let batch = TimeseriesBatch {
		configuration_id: "boiler-room-1".into(),
		records: vec![TimeseriesRecord {
			timestamp: "2024-01-01T00:00:00Z".into(),
			values: vec![DataPointValue {
				data_point_id: "temperature".into(),
				value: serde_json::json!(72.5),
				quality_code: 0,
			}],
		}],
	};

	uploads.upload_timeseries(vec![batch]).await?;

	println!("Onboarded as {:?}.", identity.get_last_access_token()?);

	register_mock.assert_async().await;
	token_mock.assert_async().await;
	exchange_mock.assert_async().await;

	Ok(())
}
