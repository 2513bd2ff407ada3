//! Optional observability helpers for identity, upload, and deployment operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `agent.operation` with the `operation`
//!   and `stage` (call site) fields.
//! - Enable `metrics` to increment the `agent_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Kinds of operations observed on an identity context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Initial onboarding against the enrollment endpoint.
	Register,
	/// Explicit key rotation.
	RotateKey,
	/// Access token issuance via the JWT bearer grant.
	AccessToken,
	/// Reconciling in-memory credentials against persistence.
	UpdateCredentials,
	/// A semi-structured data upload.
	Upload,
	/// A deployment-workflow read or patch.
	Deployment,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Register => "register",
			OperationKind::RotateKey => "rotate_key",
			OperationKind::AccessToken => "access_token",
			OperationKind::UpdateCredentials => "update_credentials",
			OperationKind::Upload => "upload",
			OperationKind::Deployment => "deployment",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an instrumented helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
