//! Storage contracts and built-in implementations for session values.
//!
//! A [`SessionStore`] is a durable string key-value store addressed by [`StoreKey`].
//! Multi-key writes and removals are atomic, so readers never observe an access
//! token paired with the wrong refresh token.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::CredentialPair};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable string storage keyed by [`StoreKey`].
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads several keys in one consistent snapshot, in the order requested.
	fn get_many<'a>(&'a self, keys: &'a [StoreKey]) -> StoreFuture<'a, Vec<Option<String>>>;

	/// Writes every entry or none of them.
	fn set_many(&self, entries: Vec<(StoreKey, String)>) -> StoreFuture<'_, ()>;

	/// Removes every listed key or none of them.
	fn remove_many<'a>(&'a self, keys: &'a [StoreKey]) -> StoreFuture<'a, ()>;

	/// Atomically replaces the stored pair if the stored refresh token matches `expected_refresh`.
	fn compare_and_swap_credentials<'a>(
		&'a self,
		expected_refresh: Option<&'a str>,
		replacement: &'a CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Reads a single key.
	fn get(&self, key: StoreKey) -> StoreFuture<'_, Option<String>> {
		Box::pin(async move {
			let keys = [key];

			Ok(self.get_many(&keys).await?.pop().flatten())
		})
	}
}

/// Result of a credential compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareAndSwapOutcome {
	/// The stored refresh token matched and the pair was replaced.
	Updated,
	/// A pair is stored but its refresh token did not match.
	RefreshMismatch,
	/// No pair is stored.
	Missing,
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Names under which session values are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StoreKey {
	/// Current access token.
	#[serde(rename = "accessToken")]
	AccessToken,
	/// Current refresh token.
	#[serde(rename = "refreshToken")]
	RefreshToken,
	/// Backend-issued taker device id.
	#[serde(rename = "deviceId")]
	DeviceId,
	/// Login id of the signed-in guardian.
	#[serde(rename = "guardianId")]
	GuardianId,
	/// Last push token sent to the backend.
	#[serde(rename = "fcmToken")]
	PushToken,
}
impl StoreKey {
	/// Keys holding the credential pair.
	pub const CREDENTIALS: [StoreKey; 2] = [StoreKey::AccessToken, StoreKey::RefreshToken];

	/// Returns the persisted key name.
	pub const fn as_str(self) -> &'static str {
		match self {
			StoreKey::AccessToken => "accessToken",
			StoreKey::RefreshToken => "refreshToken",
			StoreKey::DeviceId => "deviceId",
			StoreKey::GuardianId => "guardianId",
			StoreKey::PushToken => "fcmToken",
		}
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Loads the stored pair; `None` unless both tokens are present and non-empty.
pub async fn load_credentials(
	store: &dyn SessionStore,
) -> Result<Option<CredentialPair>, StoreError> {
	let mut values = store.get_many(&StoreKey::CREDENTIALS).await?.into_iter();
	let access = values.next().flatten().filter(|value| !value.is_empty());
	let refresh = values.next().flatten().filter(|value| !value.is_empty());

	Ok(access.zip(refresh).map(|(access, refresh)| CredentialPair::new(access, refresh)))
}

/// Persists both tokens of `pair` in one atomic write.
pub async fn save_credentials(
	store: &dyn SessionStore,
	pair: &CredentialPair,
) -> Result<(), StoreError> {
	store.set_many(credential_entries(pair)).await
}

pub(crate) fn credential_entries(pair: &CredentialPair) -> Vec<(StoreKey, String)> {
	vec![
		(StoreKey::AccessToken, pair.access_token.expose().to_owned()),
		(StoreKey::RefreshToken, pair.refresh_token.expose().to_owned()),
	]
}

/// Shared compare-and-swap rule for map-backed stores.
pub(crate) fn cas_credentials(
	map: &mut impl CredentialMap,
	expected_refresh: Option<&str>,
	replacement: &CredentialPair,
) -> CompareAndSwapOutcome {
	let outcome = match map.value(StoreKey::RefreshToken) {
		None if map.value(StoreKey::AccessToken).is_none() => CompareAndSwapOutcome::Missing,
		current if current == expected_refresh => CompareAndSwapOutcome::Updated,
		_ => CompareAndSwapOutcome::RefreshMismatch,
	};

	if outcome == CompareAndSwapOutcome::Updated {
		for (key, value) in credential_entries(replacement) {
			map.put(key, value);
		}
	}

	outcome
}

/// Minimal map view shared by the built-in stores.
pub(crate) trait CredentialMap {
	fn value(&self, key: StoreKey) -> Option<&str>;

	fn put(&mut self, key: StoreKey, value: String);
}
impl CredentialMap for HashMap<StoreKey, String> {
	fn value(&self, key: StoreKey) -> Option<&str> {
		self.get(&key).map(String::as_str)
	}

	fn put(&mut self, key: StoreKey, value: String) {
		self.insert(key, value);
	}
}
impl CredentialMap for BTreeMap<StoreKey, String> {
	fn value(&self, key: StoreKey) -> Option<&str> {
		self.get(&key).map(String::as_str)
	}

	fn put(&mut self, key: StoreKey, value: String) {
		self.insert(key, value);
	}
}
