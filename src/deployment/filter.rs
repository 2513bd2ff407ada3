//! Query-string composition for deployment-workflow reads.

/// Optional filter fields for `list`/`get`. Booleans become `key=true` when set; strings
/// become `key=value` when non-empty. Keys are joined with `&` after a single leading `?`.
#[derive(Clone, Debug, Default)]
pub struct WorkflowFilter {
	model: bool,
	history: bool,
	current_state: Option<String>,
	group: Option<String>,
	device_id: Option<String>,
	model_key: Option<String>,
}
impl WorkflowFilter {
	/// Starts an empty filter.
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests the workflow's `model` be included in the response.
	pub fn with_model(mut self) -> Self {
		self.model = true;
		self
	}

	/// Requests the workflow's `history` be included in the response.
	pub fn with_history(mut self) -> Self {
		self.history = true;
		self
	}

	/// Restricts `list` to workflows currently in `state`.
	pub fn current_state(mut self, state: impl Into<String>) -> Self {
		self.current_state = Some(state.into());
		self
	}

	/// Restricts `list` to workflows in `group`.
	pub fn group(mut self, group: impl Into<String>) -> Self {
		self.group = Some(group.into());
		self
	}

	/// Restricts `list` to workflows owned by `device_id`.
	pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
		self.device_id = Some(device_id.into());
		self
	}

	/// Restricts `list` to workflows running the given model key.
	pub fn model_key(mut self, model_key: impl Into<String>) -> Self {
		self.model_key = Some(model_key.into());
		self
	}

	/// Returns only the boolean fields (`model`, `history`), as used by `get`.
	pub(super) fn booleans_only(&self) -> Self {
		Self { model: self.model, history: self.history, ..Self::default() }
	}

	/// Composes the query string, empty if no field is set.
	pub(super) fn to_query_string(&self) -> String {
		let mut parts = Vec::new();

		if self.model {
			parts.push("model=true".to_owned());
		}
		if self.history {
			parts.push("history=true".to_owned());
		}
		if let Some(v) = self.current_state.as_ref().filter(|v| !v.is_empty()) {
			parts.push(format!("current_state={v}"));
		}
		if let Some(v) = self.group.as_ref().filter(|v| !v.is_empty()) {
			parts.push(format!("group={v}"));
		}
		if let Some(v) = self.device_id.as_ref().filter(|v| !v.is_empty()) {
			parts.push(format!("device_id={v}"));
		}
		if let Some(v) = self.model_key.as_ref().filter(|v| !v.is_empty()) {
			parts.push(format!("model_key={v}"));
		}

		if parts.is_empty() { String::new() } else { format!("?{}", parts.join("&")) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn to_query_string_joins_present_fields() {
		let filter = WorkflowFilter::new().with_model().device_id("device-1");

		assert_eq!(filter.to_query_string(), "?model=true&device_id=device-1");
	}

	#[test]
	fn booleans_only_drops_string_fields() {
		let filter = WorkflowFilter::new().with_history().group("group-1").booleans_only();

		assert_eq!(filter.to_query_string(), "?history=true");
	}

	#[test]
	fn empty_filter_produces_empty_query_string() {
		assert_eq!(WorkflowFilter::new().to_query_string(), "");
	}
}
