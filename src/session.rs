//! The signed-in session: sole owner of the credential pair.
//!
//! A [`Session`] is shared by reference (`Arc<Session>`) with every component that
//! issues authenticated calls. It keeps the current pair in memory, persists every
//! change through its [`SessionStore`], and owns the guard that serializes token
//! renewal so concurrent 401s share one renewal round trip.
//!
//! Sign-in and sign-out advance an identity epoch. A renewal that started under an
//! older epoch is dropped instead of written back, so a sign-out always wins.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, DeviceId, GuardianId, TokenSecret},
	store::{self, CompareAndSwapOutcome, SessionStore, StoreKey},
};

/// Keys removed together on sign-out.
const SIGN_OUT_KEYS: [StoreKey; 3] =
	[StoreKey::AccessToken, StoreKey::RefreshToken, StoreKey::GuardianId];

/// Credential owner shared by every caller.
pub struct Session {
	store: Arc<dyn SessionStore>,
	state: RwLock<SessionState>,
	write_guard: AsyncMutex<()>,
	refresh_guard: AsyncMutex<()>,
}
impl Session {
	/// Creates a signed-out session backed by `store`.
	pub fn new(store: Arc<dyn SessionStore>) -> Self {
		Self {
			store,
			state: RwLock::new(SessionState::default()),
			write_guard: AsyncMutex::new(()),
			refresh_guard: AsyncMutex::new(()),
		}
	}

	/// Creates a session and loads any persisted pair from `store`.
	pub async fn restore(store: Arc<dyn SessionStore>) -> Result<Self> {
		let session = Self::new(store);
		let pair = store::load_credentials(session.store.as_ref()).await?;

		session.state.write().credentials = pair;

		Ok(session)
	}

	/// Backing store.
	pub fn store(&self) -> &Arc<dyn SessionStore> {
		&self.store
	}

	/// Returns a copy of the current pair, if signed in.
	pub fn current(&self) -> Option<CredentialPair> {
		self.state.read().credentials.clone()
	}

	/// Current access token, if signed in.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.state.read().credentials.as_ref().map(|pair| pair.access_token.clone())
	}

	/// Current refresh token, if signed in.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.state.read().credentials.as_ref().map(|pair| pair.refresh_token.clone())
	}

	/// Returns `true` when a pair is held in memory.
	pub fn is_signed_in(&self) -> bool {
		self.state.read().credentials.is_some()
	}

	/// Persists `pair` in one atomic write, then publishes it.
	pub async fn sign_in(&self, pair: CredentialPair) -> Result<()> {
		let _write = self.write_guard.lock().await;

		store::save_credentials(self.store.as_ref(), &pair).await?;
		self.state.write().replace_identity(Some(pair));

		Ok(())
	}

	/// Persists `pair` together with the guardian's login id, then publishes it.
	pub async fn sign_in_as(&self, guardian: &GuardianId, pair: CredentialPair) -> Result<()> {
		let _write = self.write_guard.lock().await;
		let mut entries = store::credential_entries(&pair);

		entries.push((StoreKey::GuardianId, guardian.to_string()));

		self.store.set_many(entries).await?;
		self.state.write().replace_identity(Some(pair));

		Ok(())
	}

	/// Replaces the pair whose refresh token was `expected_refresh` with `pair`.
	///
	/// Returns the pair the session holds afterwards. When another writer already
	/// rotated the stored pair, that stored pair is adopted and `pair` is discarded.
	/// If the stored pair is gone (a sign-out elsewhere), nothing is written, the
	/// session ends up signed out and the call fails with [`Error::AuthExpired`].
	pub async fn rotate(
		&self,
		expected_refresh: &TokenSecret,
		pair: CredentialPair,
	) -> Result<CredentialPair> {
		let epoch = self.state.read().epoch;

		self.rotate_within(epoch, expected_refresh, pair).await
	}

	/// Removes both tokens and the guardian id in one atomic write and forgets the pair.
	pub async fn sign_out(&self) -> Result<()> {
		let _write = self.write_guard.lock().await;

		self.store.remove_many(&SIGN_OUT_KEYS).await?;
		self.state.write().replace_identity(None);

		Ok(())
	}

	/// Login id of the signed-in guardian, if stored.
	pub async fn guardian_id(&self) -> Result<Option<GuardianId>> {
		let value = self.store.get(StoreKey::GuardianId).await?;

		Ok(value.and_then(|value| GuardianId::new(value).ok()))
	}

	/// Device id issued to this taker device, if stored.
	pub async fn device_id(&self) -> Result<Option<DeviceId>> {
		let value = self.store.get(StoreKey::DeviceId).await?;

		Ok(value.and_then(|value| DeviceId::new(value).ok()))
	}

	/// Push token last sent to the backend, if stored.
	pub async fn push_token(&self) -> Result<Option<String>> {
		Ok(self.store.get(StoreKey::PushToken).await?.filter(|value| !value.is_empty()))
	}

	pub(crate) fn refresh_guard(&self) -> &AsyncMutex<()> {
		&self.refresh_guard
	}

	/// Identity epoch and pair, read together.
	pub(crate) fn snapshot(&self) -> (u64, Option<CredentialPair>) {
		let state = self.state.read();

		(state.epoch, state.credentials.clone())
	}

	/// Access token already renewed from `refresh` and different from `rejected`.
	pub(crate) fn renewed_access(
		&self,
		rejected: &TokenSecret,
		refresh: &TokenSecret,
	) -> Option<TokenSecret> {
		let state = self.state.read();
		let pair = state.credentials.as_ref()?;
		let same_lineage =
			pair.refresh_token == *refresh || state.renewed_from.as_ref() == Some(refresh);

		(same_lineage && pair.access_token != *rejected && !pair.access_token.is_empty())
			.then(|| pair.access_token.clone())
	}

	/// Rotates the session's pair unless a sign-in or sign-out happened since `epoch`.
	pub(crate) async fn rotate_within(
		&self,
		epoch: u64,
		expected_refresh: &TokenSecret,
		pair: CredentialPair,
	) -> Result<CredentialPair> {
		let _write = self.write_guard.lock().await;

		self.ensure_epoch(epoch)?;

		let outcome = self
			.store
			.compare_and_swap_credentials(Some(expected_refresh.expose()), &pair)
			.await?;
		let adopted = match outcome {
			CompareAndSwapOutcome::Updated => pair,
			CompareAndSwapOutcome::RefreshMismatch =>
				match store::load_credentials(self.store.as_ref()).await? {
					Some(stored) => stored,
					None => return Err(self.forget("stored credentials are incomplete")),
				},
			CompareAndSwapOutcome::Missing =>
				return Err(self.forget("stored credentials were removed during renewal")),
		};

		self.state.write().rotate(adopted.clone(), expected_refresh);

		Ok(adopted)
	}

	/// Signs a session that was empty at `epoch` in with a renewed pair.
	pub(crate) async fn adopt_within(&self, epoch: u64, pair: CredentialPair) -> Result<()> {
		let _write = self.write_guard.lock().await;

		self.ensure_epoch(epoch)?;
		store::save_credentials(self.store.as_ref(), &pair).await?;
		self.state.write().replace_identity(Some(pair));

		Ok(())
	}

	fn ensure_epoch(&self, epoch: u64) -> Result<()> {
		if self.state.read().epoch != epoch {
			return Err(Error::AuthExpired {
				reason: "session was signed out or replaced during renewal".into(),
			});
		}

		Ok(())
	}

	fn forget(&self, reason: &str) -> Error {
		self.state.write().replace_identity(None);

		Error::AuthExpired { reason: reason.into() }
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.read();

		f.debug_struct("Session")
			.field("credentials", &state.credentials)
			.field("epoch", &state.epoch)
			.finish()
	}
}

#[derive(Default)]
struct SessionState {
	credentials: Option<CredentialPair>,
	// Refresh token the current pair was renewed from.
	renewed_from: Option<TokenSecret>,
	// Bumped whenever the signed-in identity changes.
	epoch: u64,
}
impl SessionState {
	fn replace_identity(&mut self, pair: Option<CredentialPair>) {
		self.credentials = pair;
		self.renewed_from = None;
		self.epoch += 1;
	}

	fn rotate(&mut self, pair: CredentialPair, from: &TokenSecret) {
		self.credentials = Some(pair);
		self.renewed_from = Some(from.clone());
	}
}
