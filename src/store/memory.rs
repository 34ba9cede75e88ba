//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	store::{self, CompareAndSwapOutcome, SessionStore, StoreFuture, StoreKey},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, String>>>;

/// Storage backend that keeps values in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns a copy of every stored entry.
	pub fn snapshot(&self) -> HashMap<StoreKey, String> {
		self.0.read().clone()
	}

	fn get_now(map: &StoreMap, keys: &[StoreKey]) -> Vec<Option<String>> {
		let guard = map.read();

		keys.iter().map(|key| guard.get(key).cloned()).collect()
	}

	fn set_now(map: &StoreMap, entries: Vec<(StoreKey, String)>) {
		map.write().extend(entries);
	}

	fn remove_now(map: &StoreMap, keys: &[StoreKey]) {
		let mut guard = map.write();

		for key in keys {
			guard.remove(key);
		}
	}
}
impl SessionStore for MemoryStore {
	fn get_many<'a>(&'a self, keys: &'a [StoreKey]) -> StoreFuture<'a, Vec<Option<String>>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(&map, keys)) })
	}

	fn set_many(&self, entries: Vec<(StoreKey, String)>) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::set_now(&map, entries);

			Ok(())
		})
	}

	fn remove_many<'a>(&'a self, keys: &'a [StoreKey]) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::remove_now(&map, keys);

			Ok(())
		})
	}

	fn compare_and_swap_credentials<'a>(
		&'a self,
		expected_refresh: Option<&'a str>,
		replacement: &'a CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let map = self.0.clone();

		Box::pin(async move {
			let mut guard = map.write();

			Ok(store::cas_credentials(&mut *guard, expected_refresh, replacement))
		})
	}
}
