//! Taker device registration and the daily medication list.
//!
//! A taker never logs in. The device registers its push token once, receives a
//! backend-issued device id, and reads its medications by that id. Registration is
//! re-sent only when the push service rotates the token.

// crates.io
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::DeviceId,
	client::AuthenticatedClient,
	error::ConfigError,
	http::{ApiHttpClient, ApiRequest},
	obs::{self, CallKind, CallOutcome, CallSpan, trace_debug, trace_warn},
	service::paths,
	store::StoreKey,
	transport::TransportErrorMapper,
};

/// Result of [`AuthenticatedClient::register_device`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceRegistration {
	/// The push token was already registered; nothing was sent.
	Skipped {
		/// Stored device id.
		device_id: DeviceId,
	},
	/// The push token was sent to the backend.
	Sent {
		/// Device id issued by the backend, or the previously stored one.
		device_id: Option<DeviceId>,
	},
}
impl DeviceRegistration {
	/// Device id known after registration.
	pub fn device_id(&self) -> Option<&DeviceId> {
		match self {
			Self::Skipped { device_id } => Some(device_id),
			Self::Sent { device_id } => device_id.as_ref(),
		}
	}
}

/// One scheduled dose for today.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Medication {
	/// Index of this dose instance.
	pub instance_idx: u64,
	/// Index of the schedule the dose belongs to.
	pub schedule_idx: u64,
	/// Index of the taker.
	pub taker_idx: u64,
	/// Schedule title (the medication name).
	pub schedule_title: String,
	/// Taker display name.
	#[serde(default)]
	pub taker_name: String,
	/// Time of day the dose is due.
	pub scheduled_time: String,
	/// `1` once the dose was taken.
	#[serde(default)]
	pub is_taken: u8,
	/// Full date and time the dose is due.
	#[serde(default)]
	pub scheduled_datetime: String,
}
impl Medication {
	/// Returns `true` once the dose was marked as taken.
	pub fn is_taken(&self) -> bool {
		self.is_taken == 1
	}
}

/// The medication list for one day.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MedicationDay {
	/// Day the list applies to, as sent by the backend.
	pub date: String,
	/// Doses due that day.
	#[serde(default)]
	pub medications: Vec<Medication>,
}

#[derive(Serialize)]
struct DeviceInitBody<'a> {
	#[serde(rename = "FCMToken")]
	fcm_token: &'a str,
	timestamp: String,
}

#[derive(Deserialize)]
struct MedicationEnvelope {
	data: MedicationDay,
}

impl<C, M> AuthenticatedClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Sends `push_token` to the backend unless it is already registered.
	///
	/// The push token and the issued device id are persisted in one atomic write. A
	/// success response without a device id keeps any stored id.
	pub async fn register_device(&self, push_token: &str) -> Result<DeviceRegistration> {
		const KIND: CallKind = CallKind::DeviceRegistration;

		let span = CallSpan::new(KIND, "register_device");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				if push_token.trim().is_empty() {
					return Err(Error::invalid_input("push token cannot be empty"));
				}

				let store = self.session.store();
				let mut stored =
					store.get_many(&[StoreKey::PushToken, StoreKey::DeviceId]).await?.into_iter();
				let stored_token = stored.next().flatten();
				let stored_device =
					stored.next().flatten().and_then(|value| DeviceId::new(value).ok());

				if let Some(device_id) =
					stored_device.as_ref().filter(|_| stored_token.as_deref() == Some(push_token))
				{
					trace_debug!("Push token already registered; skipping device init.");

					return Ok(DeviceRegistration::Skipped { device_id: device_id.clone() });
				}

				let timestamp =
					OffsetDateTime::now_utc().format(&Rfc3339).map_err(ConfigError::from)?;
				let request = ApiRequest::post(self.service.endpoint(paths::DEVICE_INIT))
					.json(&DeviceInitBody { fcm_token: push_token, timestamp })?;
				let response = self.dispatch(KIND, &request, None).await?.error_for_status()?;
				let issued = issued_device_id(&response.body);
				let mut entries = vec![(StoreKey::PushToken, push_token.to_owned())];

				match &issued {
					Some(device_id) => entries.push((StoreKey::DeviceId, device_id.to_string())),
					None => trace_warn!("Device init response carries no device id."),
				}

				store.set_many(entries).await?;

				Ok(DeviceRegistration::Sent { device_id: issued.or(stored_device) })
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Today's medications for `device_id`.
	pub async fn medications(&self, device_id: &DeviceId) -> Result<MedicationDay> {
		let url = self.service.endpoint_with_query(paths::TAKER_MEDS, [("user", &**device_id)]);
		let response = self.send_unauthenticated(&ApiRequest::get(url)).await?.error_for_status()?;

		Ok(response.json::<MedicationEnvelope>()?.data)
	}

	/// The stored device id a guardian enters to connect this device.
	pub async fn device_code(&self) -> Result<Option<DeviceId>> {
		self.session.device_id().await
	}
}

/// Reads `data.deviceId`, accepting a string or a number.
fn issued_device_id(body: &[u8]) -> Option<DeviceId> {
	let root: Value = serde_json::from_slice(body).ok()?;
	let raw = match root.pointer("/data/deviceId")? {
		Value::String(text) => text.clone(),
		Value::Number(number) => number.to_string(),
		_ => return None,
	};

	DeviceId::new(raw).ok()
}
