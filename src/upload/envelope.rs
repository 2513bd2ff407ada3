//! Mixed-content envelope assembly: every [`UploadItem`] becomes one JSON meta part plus
//! an optional binary payload part, framed as `multipart/mixed`.

// self
use super::item::UploadItem;
use crate::_prelude::*;

/// Fixed boundary token; the envelope is built once per call and never reused across
/// requests, so a static value is sufficient to avoid accidental collision with payload
/// bytes (none of the upload kinds embed arbitrary attacker-controlled boundaries).
const BOUNDARY: &str = "mcl-envelope-3f9a1c";

/// `Content-Type` value for an assembled envelope.
pub fn content_type() -> String {
	format!("multipart/mixed; boundary={BOUNDARY}")
}

enum PartPayload<'a> {
	Json(Vec<u8>),
	Binary(&'a [u8]),
}

fn meta_descriptor(item: &UploadItem) -> Result<serde_json::Value> {
	let value = match item {
		UploadItem::Timeseries(batch) => serde_json::json!({
			"type": "timeseries",
			"configurationId": batch.configuration_id,
		}),
		UploadItem::Event(event) => serde_json::json!({ "type": "event", "version": event.version }),
		UploadItem::File(file) => serde_json::json!({
			"type": "file",
			"fileName": file.remote_name,
			"fileType": file.kind,
		}),
		UploadItem::DataSourceConfig(config) =>
			serde_json::json!({ "type": "dataSourceConfiguration", "version": config.version }),
		UploadItem::CustomData(blob) =>
			serde_json::json!({ "type": "customData", "version": blob.version, "customDataType": blob.kind }),
	};

	Ok(value)
}

fn item_payload(item: &UploadItem) -> Result<PartPayload<'_>> {
	match item {
		UploadItem::Timeseries(batch) => Ok(PartPayload::Json(
			serde_json::to_vec(&batch.records)
				.map_err(|e| Error::Fail { reason: format!("Failed to encode timeseries payload: {e}.") })?,
		)),
		UploadItem::Event(event) => Ok(PartPayload::Json(serde_json::to_vec(event).map_err(|e| {
			Error::Fail { reason: format!("Failed to encode event payload: {e}.") }
		})?)),
		UploadItem::DataSourceConfig(config) => Ok(PartPayload::Json(
			serde_json::to_vec(&config.data_sources)
				.map_err(|e| Error::Fail { reason: format!("Failed to encode data-source payload: {e}.") })?,
		)),
		UploadItem::CustomData(blob) => Ok(PartPayload::Binary(&blob.payload)),
		UploadItem::File(_) => Err(Error::Fail {
			reason: "File items are streamed via chunked uploads, not the mixed-content envelope."
				.to_owned(),
		}),
	}
}

fn render_part(meta: &serde_json::Value, payload: &PartPayload<'_>) -> Result<Vec<u8>> {
	let meta_bytes = serde_json::to_vec(meta)
		.map_err(|e| Error::Fail { reason: format!("Failed to encode part meta-descriptor: {e}.") })?;
	let mut out = Vec::new();

	out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
	out.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
	out.extend_from_slice(&meta_bytes);
	out.extend_from_slice(b"\r\n");
	out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());

	match payload {
		PartPayload::Json(bytes) => {
			out.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
			out.extend_from_slice(bytes);
		},
		PartPayload::Binary(bytes) => {
			out.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
			out.extend_from_slice(bytes);
		},
	}

	out.extend_from_slice(b"\r\n");

	Ok(out)
}

/// Assembles `items` into one mixed-content envelope body.
///
/// Every item contributes one meta part and one payload part; [`UploadItem::File`] is
/// rejected here since files are streamed through [`super::chunked`] instead.
pub fn assemble(items: &[UploadItem]) -> Result<Vec<u8>> {
	let mut out = Vec::new();

	for item in items {
		let meta = meta_descriptor(item)?;
		let payload = item_payload(item)?;

		out.extend_from_slice(&render_part(&meta, &payload)?);
	}

	out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

	Ok(out)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::upload::item::{DataPointValue, TimeseriesBatch, TimeseriesRecord};

	#[test]
	fn assemble_names_configuration_id_in_meta_part() {
		let batch = TimeseriesBatch {
			configuration_id: "config-1".into(),
			records: vec![TimeseriesRecord {
				timestamp: "2024-01-01T00:00:00Z".into(),
				values: vec![DataPointValue {
					data_point_id: "dp-1".into(),
					value: serde_json::json!(1.0),
					quality_code: 0,
				}],
			}],
		};
		let body = assemble(&[UploadItem::Timeseries(batch)]).expect("Assembly should succeed.");
		let text = String::from_utf8_lossy(&body);

		assert!(text.contains("\"configurationId\":\"config-1\""));
		assert!(text.ends_with(&format!("--{BOUNDARY}--\r\n")));
	}
}
