//! Metrics helpers and key-set reload bookkeeping.

// std
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
// crates.io
use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use smallvec::SmallVec;
// self
use crate::{_prelude::*, token::claim::TokenType};

type LabelSet = SmallVec<[Label; 2]>;

const METRIC_RELOAD_TOTAL: &str = "jwt_keyring_reload_total";
const METRIC_RELOAD_DURATION: &str = "jwt_keyring_reload_duration_seconds";
const METRIC_VERIFICATION_KEYS: &str = "jwt_keyring_verification_keys";
const METRIC_TOKENS_ISSUED: &str = "jwt_keyring_tokens_issued_total";
const METRIC_TOKENS_REJECTED: &str = "jwt_keyring_tokens_rejected_total";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Why a token failed to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
	/// Structurally broken before signature checking.
	Malformed,
	/// Signature did not match any accepted key.
	Invalid,
}
impl RejectReason {
	fn as_str(self) -> &'static str {
		match self {
			Self::Malformed => "malformed",
			Self::Invalid => "invalid",
		}
	}
}

/// Thread-safe reload counters for one key-set manager.
#[derive(Debug, Default)]
pub struct ReloadMetrics {
	reloads: AtomicU64,
	reload_failures: AtomicU64,
	last_reload_micros: AtomicU64,
}
impl ReloadMetrics {
	/// Record a successful reload and its latency.
	pub fn record_success(&self, duration: Duration) {
		self.reloads.fetch_add(1, Ordering::Relaxed);
		self.last_reload_micros.store(duration.as_micros() as u64, Ordering::Relaxed);
	}

	/// Record a failed reload.
	pub fn record_failure(&self) {
		self.reload_failures.fetch_add(1, Ordering::Relaxed);
	}

	/// Take a point-in-time snapshot for status reporting.
	pub fn snapshot(&self) -> ReloadMetricsSnapshot {
		ReloadMetricsSnapshot {
			reloads: self.reloads.load(Ordering::Relaxed),
			reload_failures: self.reload_failures.load(Ordering::Relaxed),
			last_reload_micros: match self.last_reload_micros.load(Ordering::Relaxed) {
				0 => None,
				value => Some(value),
			},
		}
	}
}

/// Read-only snapshot of [`ReloadMetrics`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReloadMetricsSnapshot {
	/// Successful reloads, the initial load included.
	pub reloads: u64,
	/// Failed reload attempts.
	pub reload_failures: u64,
	/// Microsecond latency of the most recent successful reload.
	pub last_reload_micros: Option<u64>,
}

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record a successful reload, its latency, and the size of the accepted verification set.
pub fn record_reload_success(duration: Duration, verification_keys: usize) {
	metrics::counter!(METRIC_RELOAD_TOTAL, single_label("status", "success").iter()).increment(1);
	metrics::histogram!(METRIC_RELOAD_DURATION).record(duration.as_secs_f64());
	metrics::gauge!(METRIC_VERIFICATION_KEYS).set(verification_keys as f64);
}

/// Record a failed reload attempt.
pub fn record_reload_error() {
	metrics::counter!(METRIC_RELOAD_TOTAL, single_label("status", "error").iter()).increment(1);
}

/// Record an issued token.
pub fn record_token_issued(token_type: TokenType) {
	metrics::counter!(METRIC_TOKENS_ISSUED, single_label("type", token_type.as_str()).iter())
		.increment(1);
}

/// Record a token rejected at decode time.
pub fn record_token_rejected(reason: RejectReason) {
	metrics::counter!(METRIC_TOKENS_REJECTED, single_label("reason", reason.as_str()).iter())
		.increment(1);
}

fn single_label(key: &'static str, value: &'static str) -> LabelSet {
	let mut labels = LabelSet::new();

	labels.push(Label::new(key, value));

	labels
}
