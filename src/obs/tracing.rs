// self
use crate::{_prelude::*, obs::CallKind};

/// Future returned by [`CallSpan::instrument`].
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`CallSpan::instrument`].
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// `guardian_client.call` span covering one client call.
///
/// Without the `tracing` feature this is a zero-sized marker and
/// [`instrument`](Self::instrument) hands the future back untouched.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	inner: tracing::Span,
}

#[cfg(feature = "tracing")]
impl CallSpan {
	/// Opens a span for `kind` at the named call site.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		Self { inner: tracing::info_span!("guardian_client.call", call = kind.as_str(), stage) }
	}

	/// Runs `fut` inside the span.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		tracing::Instrument::instrument(fut, self.inner.clone())
	}
}

#[cfg(not(feature = "tracing"))]
impl CallSpan {
	/// Opens a span for `kind` at the named call site.
	pub fn new(_kind: CallKind, _stage: &'static str) -> Self {
		Self {}
	}

	/// Runs `fut` inside the span.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		fut
	}
}
