//! Guardian account, taker, and schedule calls.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	api::{self, ScheduleIdx, TakerIdx},
	auth::{CredentialPair, DeviceId, GuardianId},
	client::AuthenticatedClient,
	http::{ApiHttpClient, ApiRequest},
	obs::{self, CallKind, CallOutcome, CallSpan},
	service::paths,
	transport::TransportErrorMapper,
};

/// Shortest device code a guardian may enter.
pub const DEVICE_CODE_MIN_LEN: usize = 5;
/// Shortest taker name accepted on registration.
pub const TAKER_NAME_MIN_LEN: usize = 2;

/// Guardian sign-up form.
#[derive(Clone)]
pub struct GuardianSignUp {
	/// Login id to register.
	pub guardian_id: GuardianId,
	/// Chosen password.
	pub password: String,
	/// Password typed a second time.
	pub password_confirm: String,
	/// Display name.
	pub name: String,
}
impl GuardianSignUp {
	fn validate(&self) -> Result<()> {
		if self.password.is_empty() {
			return Err(Error::invalid_input("password cannot be empty"));
		}
		if self.password != self.password_confirm {
			return Err(Error::invalid_input("password confirmation does not match"));
		}
		if self.name.trim().is_empty() {
			return Err(Error::invalid_input("guardian name cannot be blank"));
		}

		Ok(())
	}
}
impl Debug for GuardianSignUp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GuardianSignUp")
			.field("guardian_id", &self.guardian_id)
			.field("password", &"<redacted>")
			.field("name", &self.name)
			.finish()
	}
}

/// Taker registered under the signed-in guardian.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taker {
	/// Backend index.
	pub taker_idx: TakerIdx,
	/// Display name, when set.
	#[serde(default)]
	pub taker_name: Option<String>,
	/// Connected device id, when connected.
	#[serde(default)]
	pub device_id: Option<String>,
}

/// Dosage schedule as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
	/// Backend index.
	pub schedule_idx: ScheduleIdx,
	/// Owning taker, when reported.
	#[serde(default)]
	pub taker_idx: Option<TakerIdx>,
	/// Medication title.
	#[serde(default)]
	pub title: Option<String>,
	/// Free-form description.
	#[serde(default)]
	pub description: Option<String>,
	/// First day of the schedule.
	#[serde(default)]
	pub start_time: Option<String>,
	/// Last day of the schedule.
	#[serde(default)]
	pub end_time: Option<String>,
	/// Reminder times of day.
	#[serde(default)]
	pub notice_time: Vec<String>,
}

/// Schedule fields sent on create and update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDraft {
	/// Medication title.
	pub title: String,
	/// Free-form description.
	pub description: String,
	/// First day of the schedule.
	pub start_time: String,
	/// Last day of the schedule.
	pub end_time: String,
	/// Reminder times of day.
	pub notice_time: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
	guardian_id: &'a str,
	guardian_password: &'a str,
	guardian_password_confirm: &'a str,
	guardian_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
	guardian_id: &'a str,
	guardian_password: &'a str,
}

#[derive(Deserialize)]
struct LoginEnvelope {
	data: LoginData,
}

#[derive(Deserialize)]
struct LoginData {
	token: LoginTokens,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginTokens {
	access_token: String,
	refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TakerRegisterBody<'a> {
	taker_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TakerConnectBody<'a> {
	taker_idx: TakerIdx,
	device_id: &'a DeviceId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleCreateBody<'a> {
	taker_idx: TakerIdx,
	schedules: &'a [ScheduleDraft],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleUpdateBody<'a> {
	schedule_idx: ScheduleIdx,
	taker_idx: TakerIdx,
	schedule: &'a ScheduleDraft,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleDeleteBody {
	schedule_idx: ScheduleIdx,
}

impl<C, M> AuthenticatedClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a guardian account, returning the backend's message when it sends one.
	pub async fn register_guardian(&self, form: &GuardianSignUp) -> Result<Option<String>> {
		form.validate()?;

		let request = ApiRequest::post(self.service.endpoint(paths::GUARDIAN_REGISTER)).json(
			&RegisterBody {
				guardian_id: &form.guardian_id,
				guardian_password: &form.password,
				guardian_password_confirm: &form.password_confirm,
				guardian_name: form.name.trim(),
			},
		)?;
		let response = self.send_unauthenticated(&request).await?.error_for_status()?;

		Ok(api::message_of(&response))
	}

	/// Logs in and signs the session in with the issued pair and the guardian id.
	pub async fn login(&self, guardian: &GuardianId, password: &str) -> Result<CredentialPair> {
		const KIND: CallKind = CallKind::Login;

		let span = CallSpan::new(KIND, "login");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				if password.is_empty() {
					return Err(Error::invalid_input("password cannot be empty"));
				}

				let request = ApiRequest::post(self.service.endpoint(paths::GUARDIAN_LOGIN))
					.json(&LoginBody { guardian_id: guardian, guardian_password: password })?;
				let response = self.dispatch(KIND, &request, None).await?.error_for_status()?;
				let tokens = response.json::<LoginEnvelope>()?.data.token;

				if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
					return Err(Error::UnexpectedResponse {
						reason: "login response carries an empty token".into(),
					});
				}

				let pair = CredentialPair::new(tokens.access_token, tokens.refresh_token);

				self.session.sign_in_as(guardian, pair.clone()).await?;

				Ok(pair)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Signs the session out locally.
	pub async fn logout(&self) -> Result<()> {
		self.session.sign_out().await
	}

	/// Registers a taker under the signed-in guardian, returning the raw response body.
	pub async fn register_taker(&self, name: &str) -> Result<Value> {
		let name = name.trim();

		if name.chars().count() < TAKER_NAME_MIN_LEN {
			return Err(Error::invalid_input(format!(
				"taker name must have at least {TAKER_NAME_MIN_LEN} characters"
			)));
		}

		let request = ApiRequest::post(self.service.endpoint(paths::TAKER_REGISTER))
			.json(&TakerRegisterBody { taker_name: name })?;
		let response = self.request(request).await?.error_for_status()?;

		if response.is_empty() { Ok(Value::Null) } else { response.json() }
	}

	/// Connects a registered taker to the device that shows `device_code`.
	pub async fn connect_taker(&self, taker: TakerIdx, device_code: &str) -> Result<()> {
		let device_code = device_code.trim();

		if device_code.chars().count() < DEVICE_CODE_MIN_LEN {
			return Err(Error::invalid_input(format!(
				"device code must have at least {DEVICE_CODE_MIN_LEN} characters"
			)));
		}

		let device_id = DeviceId::new(device_code)?;
		let request = ApiRequest::post(self.service.endpoint(paths::TAKER_CONNECT))
			.json(&TakerConnectBody { taker_idx: taker, device_id: &device_id })?;

		self.request(request).await?.error_for_status()?;

		Ok(())
	}

	/// Lists the guardian's takers.
	pub async fn list_takers(&self) -> Result<Vec<Taker>> {
		let request = ApiRequest::get(self.service.endpoint(paths::TAKER_LIST));
		let response = self.request(request).await?.error_for_status()?;

		api::decode_list(&response)
	}

	/// Lists schedules, optionally only those of `taker`.
	pub async fn list_schedules(&self, taker: Option<TakerIdx>) -> Result<Vec<Schedule>> {
		let user = taker.map(|taker| taker.to_string());
		let url = self
			.service
			.endpoint_with_query(paths::SCHEDULE, user.as_deref().map(|user| ("user", user)));
		let response = self.request(ApiRequest::get(url)).await?.error_for_status()?;
		let schedules: Vec<Schedule> = api::decode_list(&response)?;

		Ok(match taker {
			Some(taker) => schedules
				.into_iter()
				.filter(|schedule| schedule.taker_idx.is_none_or(|owner| owner == taker))
				.collect(),
			None => schedules,
		})
	}

	/// Creates one or more schedules for `taker`.
	pub async fn create_schedules(&self, taker: TakerIdx, drafts: &[ScheduleDraft]) -> Result<()> {
		if drafts.is_empty() {
			return Err(Error::invalid_input("at least one schedule is required"));
		}

		let request = ApiRequest::post(self.service.endpoint(paths::SCHEDULE))
			.json(&ScheduleCreateBody { taker_idx: taker, schedules: drafts })?;

		self.request(request).await?.error_for_status()?;

		Ok(())
	}

	/// Replaces the fields of an existing schedule.
	pub async fn update_schedule(
		&self,
		schedule: ScheduleIdx,
		taker: TakerIdx,
		draft: &ScheduleDraft,
	) -> Result<()> {
		let request = ApiRequest::patch(self.service.endpoint(paths::SCHEDULE)).json(
			&ScheduleUpdateBody { schedule_idx: schedule, taker_idx: taker, schedule: draft },
		)?;

		self.request(request).await?.error_for_status()?;

		Ok(())
	}

	/// Deletes a schedule.
	pub async fn delete_schedule(&self, schedule: ScheduleIdx) -> Result<()> {
		let request = ApiRequest::delete(self.service.endpoint(paths::SCHEDULE))
			.json(&ScheduleDeleteBody { schedule_idx: schedule })?;

		self.request(request).await?.error_for_status()?;

		Ok(())
	}
}
