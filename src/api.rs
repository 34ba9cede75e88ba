//! Typed guardian and taker endpoint calls.
//!
//! The calls are inherent methods on [`AuthenticatedClient`](crate::client::AuthenticatedClient)
//! split by role: [`guardian`] covers account, taker and schedule management, [`taker`]
//! covers device registration and the daily medication list. Payload types mirror the
//! backend's JSON field names.

pub mod guardian;
pub mod taker;

pub use guardian::*;
pub use taker::*;

// crates.io
use serde::{Deserializer, de::DeserializeOwned};
use serde_json::Value;
// self
use crate::{_prelude::*, http::ApiResponse};

macro_rules! def_index {
	($name:ident, $doc:literal, $field:literal) => {
		#[doc = $doc]
		#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
		#[serde(transparent)]
		pub struct $name(u64);
		impl $name {
			/// Wraps a backend index; zero is rejected.
			pub fn new(value: u64) -> Result<Self> {
				if value == 0 {
					return Err(Error::invalid_input(concat!($field, " must be positive")));
				}

				Ok(Self(value))
			}

			/// Returns the raw index.
			pub const fn get(self) -> u64 {
				self.0
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				Display::fmt(&self.0, f)
			}
		}
		impl<'de> Deserialize<'de> for $name {
			fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
			where
				D: Deserializer<'de>,
			{
				Ok(Self(deserialize_index(deserializer)?))
			}
		}
	};
}

def_index! { TakerIdx, "Backend index of a taker registered under a guardian.", "takerIdx" }
def_index! { ScheduleIdx, "Backend index of a dosage schedule.", "scheduleIdx" }

/// Accepts an index sent either as a JSON number or as a numeric string.
fn deserialize_index<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(u64),
		Text(String),
	}

	match Raw::deserialize(deserializer)? {
		Raw::Number(value) => Ok(value),
		Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
	}
}

/// Decodes a list returned either as a top-level array or under `data`.
///
/// Empty bodies and bodies carrying neither shape decode to an empty list.
pub(crate) fn decode_list<T>(response: &ApiResponse) -> Result<Vec<T>>
where
	T: DeserializeOwned,
{
	if response.is_empty() {
		return Ok(Vec::new());
	}

	let root: Value = response.json()?;
	let items = match root {
		Value::Array(items) => items,
		Value::Object(mut object) => match object.remove("data") {
			Some(Value::Array(items)) => items,
			_ => Vec::new(),
		},
		_ => Vec::new(),
	};

	serde_path_to_error::deserialize(Value::Array(items)).map_err(|source| Error::Decode { source })
}

/// Reads `message` from a JSON body, if present.
pub(crate) fn message_of(response: &ApiResponse) -> Option<String> {
	if response.is_empty() {
		return None;
	}

	let root: Value = serde_json::from_slice(&response.body).ok()?;

	root.get("message").and_then(Value::as_str).map(ToOwned::to_owned)
}
