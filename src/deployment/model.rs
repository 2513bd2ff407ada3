//! Deployment workflow value objects.

// self
use crate::_prelude::*;

/// One state in a workflow [`Model`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDefinition {
	/// State name.
	pub name: String,
	/// Human-readable description.
	#[serde(default)]
	pub description: String,
	/// Whether this is the model's initial state.
	#[serde(default)]
	pub initial: bool,
	/// Whether this is a terminal state.
	#[serde(default, rename = "final")]
	pub r#final: bool,
	/// Whether reaching this state cancels the workflow.
	#[serde(default)]
	pub cancel: bool,
}

/// One allowed transition in a workflow [`Model`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transition {
	/// Source state name.
	pub from: String,
	/// Destination state name.
	pub to: String,
	/// Transition type, server-defined.
	#[serde(rename = "type")]
	pub kind: String,
	/// Opaque transition details.
	#[serde(default)]
	pub details: serde_json::Value,
}

/// A named group of states within a [`Model`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateGroup {
	/// Group name.
	pub name: String,
	/// Member state names.
	#[serde(default)]
	pub state_names: Vec<String>,
}

/// The full state-machine model a workflow instance is running against.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
	/// Model key.
	pub key: String,
	/// States in the model.
	#[serde(default)]
	pub states: Vec<StateDefinition>,
	/// Allowed transitions.
	#[serde(default)]
	pub transitions: Vec<Transition>,
	/// State groups.
	#[serde(default)]
	pub state_groups: Vec<StateGroup>,
}

/// The current (or target) state of a workflow instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
	/// State name.
	pub state: String,
	/// Progress in `[0.0, 1.0]`.
	#[serde(default)]
	pub progress: f64,
	/// When this state was entered, ISO-8601.
	#[serde(default)]
	pub entered: Option<String>,
	/// When this state was last updated, ISO-8601.
	#[serde(default)]
	pub updated: Option<String>,
	/// Human-readable message.
	#[serde(default)]
	pub message: String,
	/// Opaque state details.
	#[serde(default)]
	pub details: serde_json::Value,
}

/// A deployment workflow instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
	/// Workflow instance id.
	pub id: String,
	/// Owning device id.
	pub device_id: String,
	/// Creation timestamp, ISO-8601.
	pub created_at: String,
	/// Current state.
	pub current_state: WorkflowState,
	/// Full state history, if requested.
	#[serde(default)]
	pub history: Option<Vec<WorkflowState>>,
	/// The model this instance runs against, if requested.
	#[serde(default)]
	pub model: Option<Model>,
	/// Opaque, business-defined instance data.
	#[serde(default)]
	pub data: serde_json::Value,
}
