// self
use crate::obs::{CallKind, CallOutcome};

/// Counter bumped once per recorded outcome.
pub const CALL_COUNTER: &str = "guardian_client_call_total";

/// Bumps [`CALL_COUNTER`] labeled with `call` and `outcome`.
///
/// Does nothing unless the `metrics` feature is on and a recorder is installed.
#[cfg(feature = "metrics")]
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	metrics::counter!(CALL_COUNTER, "call" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);
}

/// Bumps [`CALL_COUNTER`] labeled with `call` and `outcome`.
///
/// Does nothing unless the `metrics` feature is on and a recorder is installed.
#[cfg(not(feature = "metrics"))]
pub fn record_call_outcome(_kind: CallKind, _outcome: CallOutcome) {}
