//! Deployment workflow client: list/get/patch against a single resource collection.

// self
use super::{
	filter::WorkflowFilter,
	model::{Workflow, WorkflowState},
};
use crate::{
	_prelude::*,
	compose::{self, Bearer, ContentType},
	http::{HttpEngine, HttpRequest, Method},
	identity::IdentityContext,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

const INSTANCES_PATH: &str = "api/deploymentworkflow/v3/instances";

#[derive(Serialize)]
struct PatchBody<'a> {
	state: &'a str,
	progress: f64,
	message: &'a str,
	details: serde_json::Value,
}

/// Handle over an onboarded identity that lists, reads, and advances deployment
/// workflows.
pub struct DeploymentsContext<'a, E> {
	identity: &'a IdentityContext<E>,
}
impl<'a, E: HttpEngine> DeploymentsContext<'a, E> {
	/// Wraps an identity context.
	pub fn new(identity: &'a IdentityContext<E>) -> Self {
		Self { identity }
	}

	/// Lists workflow instances, optionally filtered.
	pub async fn list(&self, filter: Option<&WorkflowFilter>) -> Result<Vec<Workflow>> {
		const KIND: OperationKind = OperationKind::Deployment;

		let span = OperationSpan::new(KIND, "list");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let query = filter.map(WorkflowFilter::to_query_string).unwrap_or_default();
				let url = self.instances_url(&query)?;
				let response = self.fetch(url).await?;
				let workflows: Vec<Workflow> = Error::parse_json(&response.body)?;

				Ok(workflows)
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	/// Fetches a single workflow instance, optionally with `model`/`history` included.
	pub async fn get(&self, id: &str, filter: Option<&WorkflowFilter>) -> Result<Workflow> {
		const KIND: OperationKind = OperationKind::Deployment;

		let span = OperationSpan::new(KIND, "get");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let query =
					filter.map(WorkflowFilter::booleans_only).unwrap_or_default().to_query_string();
				let url = self.instance_url(id, &query)?;
				let response = self.fetch(url).await?;
				let workflow: Workflow = Error::parse_json(&response.body)?;

				Ok(workflow)
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	/// Advances a workflow instance to `state`, with optional `progress`/`details`.
	pub async fn update(
		&self,
		id: &str,
		state: &str,
		message: &str,
		progress: Option<f64>,
		details: Option<serde_json::Value>,
		filter: Option<&WorkflowFilter>,
	) -> Result<Workflow> {
		const KIND: OperationKind = OperationKind::Deployment;

		let span = OperationSpan::new(KIND, "update");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let query =
					filter.map(WorkflowFilter::booleans_only).unwrap_or_default().to_query_string();
				let url = self.instance_url(id, &query)?;
				let body = PatchBody {
					state,
					progress: progress.unwrap_or(0.0),
					message,
					details: details.unwrap_or_else(|| serde_json::json!({})),
				};
				let payload = serde_json::to_vec(&body).map_err(|e| Error::Fail {
					reason: format!("Failed to encode workflow patch: {e}."),
				})?;
				let bearer = self.identity.get_last_access_token()?;
				let headers = compose::standard_headers(
					Some(Bearer::AccessToken(bearer.expose())),
					&self.identity.config().user_agent_comment,
					true,
					Some(ContentType::Json),
				);
				let mut request = HttpRequest::new(Method::Patch, url).with_bytes_body(payload);

				for (name, value) in headers.pairs {
					request = request.header(name, value);
				}

				let response = self.identity.engine().send(request).await?;
				let response = compose::check_status(response, |r| response_excerpt(r))?;
				let workflow: Workflow = Error::parse_json(&response.body)?;

				Ok(workflow)
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	fn instances_url(&self, query: &str) -> Result<Url> {
		let base = self
			.identity
			.config()
			.platform_base_url
			.join(INSTANCES_PATH)
			.map_err(|e| Error::Fail { reason: format!("Failed to build instances URL: {e}.") })?;

		Url::parse(&format!("{base}{query}"))
			.map_err(|e| Error::Fail { reason: format!("Failed to compose query string: {e}.") })
	}

	fn instance_url(&self, id: &str, query: &str) -> Result<Url> {
		let base = self
			.identity
			.config()
			.platform_base_url
			.join(&format!("{INSTANCES_PATH}/{id}"))
			.map_err(|e| Error::Fail { reason: format!("Failed to build instance URL: {e}.") })?;

		Url::parse(&format!("{base}{query}"))
			.map_err(|e| Error::Fail { reason: format!("Failed to compose query string: {e}.") })
	}

	async fn fetch(&self, url: Url) -> Result<crate::http::HttpResponse> {
		let bearer = self.identity.get_last_access_token()?;
		let headers = compose::standard_headers(
			Some(Bearer::AccessToken(bearer.expose())),
			&self.identity.config().user_agent_comment,
			true,
			None,
		);
		let mut request = HttpRequest::new(Method::Get, url);

		for (name, value) in headers.pairs {
			request = request.header(name, value);
		}

		let response = self.identity.engine().send(request).await?;

		compose::check_status(response, |r| response_excerpt(r))
	}
}

fn response_excerpt(response: &crate::http::HttpResponse) -> String {
	String::from_utf8_lossy(&response.body).chars().take(256).collect()
}
