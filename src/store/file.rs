//! File-backed [`SessionStore`] that survives process restarts.
//!
//! Every mutation rewrites a JSON snapshot through a temporary sibling file that is
//! synced and then renamed over the live file. A crash therefore leaves either the
//! previous snapshot or the new one on disk, never a half-written credential pair.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	store::{self, CompareAndSwapOutcome, SessionStore, StoreError, StoreFuture, StoreKey},
};

type Snapshot = BTreeMap<StoreKey, String>;

/// Persists session values to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	///
	/// A leftover temporary file from an interrupted write is discarded.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let tmp_path = Self::tmp_path_for(&path);

		if tmp_path.exists() {
			fs::remove_file(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to discard {}: {e}", tmp_path.display()),
			})?;
		}

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the live snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Temporary sibling used while a new snapshot is being written.
	pub fn tmp_path_for(path: &Path) -> PathBuf {
		let mut tmp_path = path.to_path_buf();

		tmp_path.set_extension("tmp");

		tmp_path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		if !path.exists() {
			return Ok(Snapshot::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(Snapshot::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Snapshot) -> Result<(), StoreError> {
		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let tmp_path = Self::tmp_path_for(&self.path);

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Applies `mutate` to a copy of the snapshot and publishes it only once persisted.
	fn commit<T>(&self, mutate: impl FnOnce(&mut Snapshot) -> T) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();
		let value = mutate(&mut next);

		if next != *guard {
			self.persist_locked(&next)?;

			*guard = next;
		}

		Ok(value)
	}
}
impl SessionStore for FileStore {
	fn get_many<'a>(&'a self, keys: &'a [StoreKey]) -> StoreFuture<'a, Vec<Option<String>>> {
		Box::pin(async move {
			let guard = self.inner.read();

			Ok(keys.iter().map(|key| guard.get(key).cloned()).collect())
		})
	}

	fn set_many(&self, entries: Vec<(StoreKey, String)>) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.commit(|snapshot| snapshot.extend(entries)) })
	}

	fn remove_many<'a>(&'a self, keys: &'a [StoreKey]) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.commit(|snapshot| {
				for key in keys {
					snapshot.remove(key);
				}
			})
		})
	}

	fn compare_and_swap_credentials<'a>(
		&'a self,
		expected_refresh: Option<&'a str>,
		replacement: &'a CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			self.commit(|snapshot| store::cas_credentials(snapshot, expected_refresh, replacement))
		})
	}
}
