//! Deployment workflow client: list/get/patch against a single resource collection. See
//! [`client::DeploymentsContext`] for the entry point.

mod client;
mod filter;
mod model;

pub use client::DeploymentsContext;
pub use filter::WorkflowFilter;
pub use model::{Model, StateDefinition, StateGroup, Transition, Workflow, WorkflowState};
