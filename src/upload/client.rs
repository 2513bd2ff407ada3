//! Uploads context: assembles envelopes and mapping requests over an onboarded identity.

// self
use super::{
	chunked,
	envelope,
	item::{FileUpload, Mapping, TimeseriesBatch, TimeseriesRecord, UploadItem},
};
use crate::{
	_prelude::*,
	compose::{self, Bearer, ContentType},
	http::{HttpEngine, HttpRequest, Method},
	identity::IdentityContext,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

const EXCHANGE_PATH: &str = "api/mindconnect/v3/exchange";
const MAPPINGS_PATH: &str = "api/mindconnect/v3/dataPointMappings";

/// Handle over an onboarded identity that assembles and sends uploads.
pub struct UploadsContext<'a, E> {
	identity: &'a IdentityContext<E>,
}
impl<'a, E: HttpEngine> UploadsContext<'a, E> {
	/// Wraps an identity context. The identity must already be onboarded and hold a
	/// current access token; callers are responsible for driving
	/// [`IdentityContext::register`]/[`IdentityContext::get_access_token`] first.
	pub fn new(identity: &'a IdentityContext<E>) -> Self {
		Self { identity }
	}

	/// Uploads timeseries batches, grouping records sharing a `configuration_id` into a
	/// single envelope per id.
	pub async fn upload_timeseries(&self, batches: Vec<TimeseriesBatch>) -> Result<()> {
		let mut grouped: HashMap<String, Vec<TimeseriesRecord>> = HashMap::new();

		for batch in batches {
			grouped.entry(batch.configuration_id).or_default().extend(batch.records);
		}

		for (configuration_id, records) in grouped {
			let item = UploadItem::Timeseries(TimeseriesBatch { configuration_id, records });

			self.send_envelope(&[item]).await?;
		}

		Ok(())
	}

	/// Uploads a batch of events in a single envelope.
	pub async fn upload_events(&self, events: Vec<super::item::Event>) -> Result<()> {
		let items = events.into_iter().map(UploadItem::Event).collect::<Vec<_>>();

		self.send_envelope(&items).await
	}

	/// Uploads a data-source configuration in a single envelope.
	pub async fn upload_data_source_config(
		&self,
		config: super::item::DataSourceConfiguration,
	) -> Result<()> {
		self.send_envelope(&[UploadItem::DataSourceConfig(config)]).await
	}

	/// Uploads a custom-data blob in a single envelope.
	pub async fn upload_custom_data(&self, blob: super::item::CustomDataBlob) -> Result<()> {
		self.send_envelope(&[UploadItem::CustomData(blob)]).await
	}

	/// Streams a file to the platform in sequential range uploads, each no larger than
	/// the configured max payload size.
	pub async fn upload_file(&self, file: &FileUpload) -> Result<()> {
		const KIND: OperationKind = OperationKind::Upload;

		let span = OperationSpan::new(KIND, "upload_file");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let config = self.identity.config();
				let url = config.platform_base_url.join(EXCHANGE_PATH).map_err(|e| Error::Fail {
					reason: format!("Failed to build exchange URL: {e}."),
				})?;
				let bearer = self.identity.get_last_access_token()?;

				chunked::upload_file(
					self.identity.engine(),
					url,
					bearer.expose(),
					&config.user_agent_comment,
					&file.local_path,
					config.max_http_payload_size,
				)
				.await?;

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	/// Creates a data-point mapping via the dedicated endpoint (a plain JSON body, not
	/// the mixed-content envelope).
	pub async fn create_mapping(&self, mapping: &Mapping) -> Result<()> {
		const KIND: OperationKind = OperationKind::Upload;

		let span = OperationSpan::new(KIND, "create_mapping");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let config = self.identity.config();
				let url = config.platform_base_url.join(MAPPINGS_PATH).map_err(|e| Error::Fail {
					reason: format!("Failed to build mappings URL: {e}."),
				})?;
				let bearer = self.identity.get_last_access_token()?;
				let payload = serde_json::to_vec(mapping)
					.map_err(|e| Error::Fail { reason: format!("Failed to encode mapping: {e}.") })?;
				let headers = compose::standard_headers(
					Some(Bearer::AccessToken(bearer.expose())),
					&config.user_agent_comment,
					true,
					Some(ContentType::Json),
				);
				let mut request = HttpRequest::new(Method::Post, url).with_bytes_body(payload);

				for (name, value) in headers.pairs {
					request = request.header(name, value);
				}

				let response = self.identity.engine().send(request).await?;

				compose::check_status(response, |r| response_excerpt(r))?;

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	async fn send_envelope(&self, items: &[UploadItem]) -> Result<()> {
		const KIND: OperationKind = OperationKind::Upload;

		let span = OperationSpan::new(KIND, "send_envelope");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let config = self.identity.config();
				let body = envelope::assemble(items)?;

				if body.len() as u32 > config.max_http_payload_size {
					return Err(Error::LimitExceeded {
						reason: format!(
							"Envelope of {} bytes exceeds the configured max payload size of {} bytes.",
							body.len(),
							config.max_http_payload_size
						),
					});
				}

				let url = config.platform_base_url.join(EXCHANGE_PATH).map_err(|e| Error::Fail {
					reason: format!("Failed to build exchange URL: {e}."),
				})?;
				let bearer = self.identity.get_last_access_token()?;
				let headers = compose::standard_headers(
					Some(Bearer::AccessToken(bearer.expose())),
					&config.user_agent_comment,
					true,
					Some(ContentType::MixedContent),
				);
				let mut request = HttpRequest::new(Method::Post, url).with_bytes_body(body);

				for (name, value) in headers.pairs {
					request = request.header(name, value);
				}

				let response = self.identity.engine().send(request).await?;

				compose::check_status(response, |r| response_excerpt(r))?;

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}
}

fn response_excerpt(response: &crate::http::HttpResponse) -> String {
	String::from_utf8_lossy(&response.body).chars().take(256).collect()
}
