//! Agent identity: onboarding, rekey, credential persistence, and self-issued access
//! tokens. See [`context::IdentityContext`] for the entry point.

mod context;
mod record;
mod store;
mod wire;

pub use context::{IdentityContext, IdentityState};
pub use record::{AccessToken, IdentityRecord, SecretMaterial};
pub use store::{CredentialPersistence, FileCredentialStore, MemoryCredentialStore};
