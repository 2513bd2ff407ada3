//! Persistence callback contract—the only non-network boundary of the core.
//!
//! The core takes ownership of a loaded record and never mutates it on save; it is the
//! caller's responsibility to serialize concurrent access to a shared backing store.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{_prelude::*, identity::record::IdentityRecord};

/// Adapter over caller-supplied load/save callbacks, keyed to the active security
/// profile.
///
/// `load` returning `Ok(None)` is the documented `NOT_LOADED`/`CREDENTIALS_NOT_LOADED`
/// outcome; it is not an error by itself—[`super::context::IdentityContext::new`]
/// decides whether that is fatal based on whether an enrollment token is configured.
pub trait CredentialPersistence: Send + Sync {
	/// Loads a previously persisted record, if any.
	fn load(&self) -> Result<Option<IdentityRecord>>;

	/// Persists `record` after a mutation. A failure here must not roll back the
	/// in-memory state; callers surface `CREDENTIALS_NOT_SAVED` while keeping the new
	/// credentials active (see DESIGN.md).
	fn save(&self, record: &IdentityRecord) -> Result<()>;
}

/// In-memory [`CredentialPersistence`], for tests and callers that accept losing
/// credentials on process exit.
#[derive(Default)]
pub struct MemoryCredentialStore {
	inner: RwLock<Option<IdentityRecord>>,
}
impl CredentialPersistence for MemoryCredentialStore {
	fn load(&self) -> Result<Option<IdentityRecord>> {
		Ok(self.inner.read().clone())
	}

	fn save(&self, record: &IdentityRecord) -> Result<()> {
		*self.inner.write() = Some(record.clone());

		Ok(())
	}
}

/// File-backed [`CredentialPersistence`] that persists the record as JSON, writing to a
/// temporary file and renaming it into place so a crash mid-write never corrupts the
/// previous snapshot.
pub struct FileCredentialStore {
	path: PathBuf,
}
impl FileCredentialStore {
	/// Opens (or prepares to create) a store at the provided path.
	pub fn open(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	fn ensure_parent_exists(path: &Path) -> Result<()> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| Error::Fail {
				reason: format!("Failed to create credential store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}
}
impl CredentialPersistence for FileCredentialStore {
	fn load(&self) -> Result<Option<IdentityRecord>> {
		if !self.path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(&self.path).map_err(|_| Error::CredentialsNotLoaded)?;

		if bytes.is_empty() {
			return Ok(None);
		}

		let record = serde_json::from_slice(&bytes)
			.map_err(|e| Error::Fail { reason: format!("Failed to parse credential store: {e}") })?;

		Ok(Some(record))
	}

	fn save(&self, record: &IdentityRecord) -> Result<()> {
		Self::ensure_parent_exists(&self.path).map_err(|_| Error::CredentialsNotSaved)?;

		let serialized = serde_json::to_vec_pretty(record)
			.map_err(|_| Error::CredentialsNotSaved)?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		(|| -> std::io::Result<()> {
			let mut file = File::create(&tmp_path)?;

			file.write_all(&serialized)?;
			file.sync_all()?;
			fs::rename(&tmp_path, &self.path)?;

			Ok(())
		})()
		.map_err(|_| Error::CredentialsNotSaved)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::identity::record::SecretMaterial;

	fn fixture_record() -> IdentityRecord {
		IdentityRecord {
			client_id: "client-1".into(),
			material: SecretMaterial::Shared { client_secret: "secret".into() },
			registration_access_token: "rat-1".into(),
			registration_uri: Url::parse("https://host/register/client-1").unwrap(),
		}
	}

	#[test]
	fn memory_store_round_trips() {
		let store = MemoryCredentialStore::default();

		assert!(store.load().unwrap().is_none());

		store.save(&fixture_record()).expect("Save should succeed.");

		let loaded = store.load().unwrap().expect("Record should be present after save.");

		assert_eq!(loaded.client_id, "client-1");
	}

	#[test]
	fn file_store_round_trips_across_reopen() {
		let path = env::temp_dir().join(format!(
			"mindconnect_credentials_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		));
		let store = FileCredentialStore::open(&path);

		store.save(&fixture_record()).expect("Save should succeed.");

		let reopened = FileCredentialStore::open(&path);
		let loaded = reopened.load().unwrap().expect("Record should survive reopen.");

		assert_eq!(loaded.client_id, "client-1");

		fs::remove_file(&path).expect("Temporary credential file should be removable.");
	}
}
