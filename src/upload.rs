//! Upload assembly: serializes uploadable items into the platform's mixed-content
//! envelope, and streams files in bounded chunks. See [`client::UploadsContext`] for the
//! entry point.

pub mod chunked;
pub mod envelope;
pub mod item;

mod client;

pub use client::UploadsContext;
pub use item::{
	CustomDataBlob, DataPoint, DataPointValue, DataSourceConfiguration, DataSourceDefinition, Event,
	FileUpload, Mapping, Severity, TimeseriesBatch, TimeseriesRecord, UploadItem,
};
