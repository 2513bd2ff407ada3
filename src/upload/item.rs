//! The upload sum type: one variant per uploadable kind, replacing void-pointer "item"
//! polymorphism with a total function over a closed set.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// One data-point reading within a [`TimeseriesRecord`].
#[derive(Clone, Debug, Serialize)]
pub struct DataPointValue {
	/// Data-point identifier.
	pub data_point_id: String,
	/// Value, serialized as the platform expects (numeric or string).
	pub value: serde_json::Value,
	/// Platform quality code.
	pub quality_code: i32,
}

/// Readings for every data point at one instant.
#[derive(Clone, Debug, Serialize)]
pub struct TimeseriesRecord {
	/// ISO-8601 timestamp.
	pub timestamp: String,
	/// Values recorded at `timestamp`.
	pub values: Vec<DataPointValue>,
}

/// A batch of readings for a single configuration id.
///
/// [`super::client::UploadsContext::upload_timeseries`] groups batches sharing a
/// `configuration_id` into one envelope; this type models the already-grouped unit the
/// wire format expects.
#[derive(Clone, Debug, Serialize)]
pub struct TimeseriesBatch {
	/// Data-source configuration this batch belongs to.
	pub configuration_id: String,
	/// Readings, usually at a fixed period.
	pub records: Vec<TimeseriesRecord>,
}

/// Event severity.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
	/// Error.
	Error,
	/// Warning.
	Warning,
	/// Information.
	Information,
}

/// A versioned event.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
	/// Schema version, e.g. `"1.0.0"`.
	pub version: String,
	/// Event type, server-defined.
	#[serde(rename = "type")]
	pub kind: String,
	/// ISO-8601 timestamp.
	pub timestamp: String,
	/// Severity.
	pub severity: Severity,
	/// Human-readable description.
	pub description: String,
	/// Optional custom fields.
	#[serde(skip_serializing_if = "HashMap::is_empty")]
	pub custom_fields: HashMap<String, serde_json::Value>,
}

/// A file to stream from disk to the platform, in chunked range uploads.
#[derive(Clone, Debug)]
pub struct FileUpload {
	/// Local filesystem path the bytes are read from.
	pub local_path: PathBuf,
	/// Remote file name the platform stores the upload under.
	pub remote_name: String,
	/// File type, server-defined (e.g. MIME type or platform file-type tag).
	pub kind: String,
	/// Optional creation timestamp, ISO-8601.
	pub creation_timestamp: Option<String>,
}

/// One data point within a [`DataSourceDefinition`].
#[derive(Clone, Debug, Serialize)]
pub struct DataPoint {
	/// Data-point identifier.
	pub id: String,
	/// Human-readable name.
	pub name: String,
	/// Value type, e.g. `"DOUBLE"`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Unit of measure.
	pub unit: String,
	/// Description.
	pub description: String,
	/// Optional custom data.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub custom_data: Option<serde_json::Value>,
}

/// One data source within a [`DataSourceConfiguration`].
#[derive(Clone, Debug, Serialize)]
pub struct DataSourceDefinition {
	/// Data-source name.
	pub name: String,
	/// Description.
	pub description: String,
	/// Data points exposed by this source.
	pub data_points: Vec<DataPoint>,
	/// Optional custom data.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub custom_data: Option<serde_json::Value>,
}

/// A versioned data-source configuration.
#[derive(Clone, Debug, Serialize)]
pub struct DataSourceConfiguration {
	/// Configuration identifier.
	pub id: String,
	/// Schema version.
	pub version: String,
	/// Data sources making up this configuration.
	pub data_sources: Vec<DataSourceDefinition>,
}

/// A versioned, opaque custom-data payload.
#[derive(Clone, Debug)]
pub struct CustomDataBlob {
	/// Schema version.
	pub version: String,
	/// Blob type, server-defined.
	pub kind: String,
	/// Optional custom metadata, serialized alongside the meta descriptor.
	pub custom_data: Option<serde_json::Value>,
	/// Opaque binary payload.
	pub payload: Vec<u8>,
}

/// A data-point-to-asset mapping, sent to a dedicated endpoint rather than through the
/// mixed-content envelope.
#[derive(Clone, Debug, Serialize)]
pub struct Mapping {
	/// Data-point identifier.
	pub data_point_id: String,
	/// Target entity id, when mapping to a specific asset.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub entity_id: Option<String>,
	/// Target property-set name.
	pub property_set_name: String,
	/// Target property name.
	pub property_name: String,
	/// Whether to keep the mapping if the asset model changes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keep_mapping: Option<bool>,
}

/// An item ready for envelope assembly. Every upload kind funnels through this sum;
/// [`super::envelope::assemble`] is total over it.
pub enum UploadItem {
	/// Timeseries batch.
	Timeseries(TimeseriesBatch),
	/// Event.
	Event(Event),
	/// File, streamed separately via [`super::chunked`] rather than buffered whole.
	File(FileUpload),
	/// Data-source configuration.
	DataSourceConfig(DataSourceConfiguration),
	/// Custom data blob.
	CustomData(CustomDataBlob),
}
