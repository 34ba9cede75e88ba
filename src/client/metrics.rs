// std
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Per-client renewal counters.
///
/// `attempts` counts renewal calls that actually hit the network. A 401 settled with
/// a token some other caller had just renewed bumps `reused` instead.
#[derive(Debug, Default)]
pub struct RenewalMetrics {
	sent: AtomicU64,
	renewed: AtomicU64,
	rejected: AtomicU64,
	reused: AtomicU64,
}
impl RenewalMetrics {
	/// Renewal calls sent.
	pub fn attempts(&self) -> u64 {
		self.sent.load(Relaxed)
	}

	/// Renewals that yielded a usable pair.
	pub fn successes(&self) -> u64 {
		self.renewed.load(Relaxed)
	}

	/// Renewals that failed for any reason.
	pub fn failures(&self) -> u64 {
		self.rejected.load(Relaxed)
	}

	/// 401s settled without a renewal call.
	pub fn reused(&self) -> u64 {
		self.reused.load(Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		bump(&self.sent);
	}

	pub(crate) fn record_success(&self) {
		bump(&self.renewed);
	}

	pub(crate) fn record_failure(&self) {
		bump(&self.rejected);
	}

	pub(crate) fn record_reused(&self) {
		bump(&self.reused);
	}
}

fn bump(counter: &AtomicU64) {
	counter.fetch_add(1, Relaxed);
}
