//! Key-set lifecycle: initial load, periodic reload, and lock-free snapshot reads.

// std
use std::{
	collections::BTreeSet,
	fmt::{Debug, Formatter, Result as FmtResult},
	sync::Mutex,
};
// crates.io
use arc_swap::ArcSwapOption;
use jsonwebtoken::jwk::JwkSet;
use tokio::{
	runtime::Handle,
	task::{self, JoinHandle},
	time::{self, MissedTickBehavior},
};
// self
use crate::{
	_prelude::*,
	jws::{Jws, PublicKeyOf, rsa::RsaJws},
	keys::set::KeySet,
	metrics::{self, ReloadMetrics},
	source::SecretSource,
};

/// Owns the live key set and keeps it eventually fresh.
///
/// Reads never block: they load the current snapshot pointer. A reload fetches and parses off any
/// lock and then swaps the pointer, so readers see either the old or the new set in full. When
/// two reloads race, the last one to finish wins.
pub struct KeySetManager<J = RsaJws>
where
	J: Jws,
{
	shared: Arc<Shared<J>>,
	reloader: Mutex<Option<JoinHandle<()>>>,
}
impl KeySetManager<RsaJws> {
	/// Start building a manager over the given source with the default RSA capability.
	pub fn builder(source: impl SecretSource + 'static) -> KeySetManagerBuilder<RsaJws> {
		KeySetManagerBuilder {
			source: Box::new(source),
			jws: RsaJws::new(),
			reload_interval: None,
		}
	}
}
impl<J> KeySetManager<J>
where
	J: Jws,
{
	/// Load synchronously and, for a positive interval, schedule periodic reloads.
	///
	/// `reload_interval_seconds <= 0` loads once and never again on its own.
	pub fn new(
		source: impl SecretSource + 'static,
		reload_interval_seconds: i64,
		jws: J,
	) -> Result<Self> {
		KeySetManager::<RsaJws>::builder(source)
			.jws(jws)
			.reload_interval_seconds(reload_interval_seconds)
			.build()
	}

	/// Fetch, parse, and atomically install a new key set.
	///
	/// On failure the previously installed set stays in place.
	pub fn reload(&self) -> Result<Arc<KeySet<J::Key>>> {
		self.shared.reload()
	}

	/// Current snapshot.
	pub fn current_key_set(&self) -> Result<Arc<KeySet<J::Key>>> {
		self.shared.cache.load_full().ok_or(Error::NotLoaded)
	}

	/// Key used to sign new tokens.
	pub fn active_signing_key(&self) -> Result<J::Key> {
		Ok(self.current_key_set()?.active().clone())
	}

	/// Public halves of the current key and every present grace key.
	pub fn verification_keys(&self) -> Result<Vec<PublicKeyOf<J>>> {
		Ok(self.current_key_set()?.verification_keys().to_vec())
	}

	/// Accepted verification keys rendered as a publishable JWKS document.
	pub fn public_jwks(&self) -> Result<JwkSet> {
		let set = self.current_key_set()?;
		let mut keys = Vec::with_capacity(set.verification_keys().len());

		for key in set.verification_keys() {
			if let Some(jwk) = self.shared.jws.public_jwk(key)? {
				keys.push(jwk);
			}
		}

		Ok(JwkSet { keys })
	}

	/// Describe the installed key set and reload history.
	pub fn status(&self) -> Result<KeySetStatus> {
		let set = self.current_key_set()?;
		let metrics = self.shared.metrics.snapshot();

		Ok(KeySetStatus {
			current_kid: set.current_kid().to_owned(),
			grace_kids: set.grace_kids().clone(),
			key_count: set.private_keys().len(),
			verification_kids: set.verification_kids().to_vec(),
			loaded_at: set.loaded_at(),
			reloads: metrics.reloads,
			reload_failures: metrics.reload_failures,
			last_reload_micros: metrics.last_reload_micros,
			periodic_reload: self.is_reloading(),
		})
	}

	/// Signing capability the key set was parsed with.
	pub fn jws(&self) -> &J {
		&self.shared.jws
	}

	/// Whether the background reloader is still scheduled.
	pub fn is_reloading(&self) -> bool {
		self.reloader
			.lock()
			.map(|guard| guard.as_ref().is_some_and(|handle| !handle.is_finished()))
			.unwrap_or(false)
	}

	/// Stop the background reloader; the installed key set keeps serving.
	pub fn shutdown(&self) {
		let handle = match self.reloader.lock() {
			Ok(mut guard) => guard.take(),
			Err(poisoned) => poisoned.into_inner().take(),
		};

		if let Some(handle) = handle {
			handle.abort();

			tracing::info!(source = %self.shared.source.origin(), "key set reloader stopped");
		}
	}

	#[cfg(test)]
	pub(crate) fn unloaded(source: impl SecretSource + 'static, jws: J) -> Self {
		Self {
			shared: Arc::new(Shared::new(Box::new(source), jws)),
			reloader: Mutex::new(None),
		}
	}
}
impl<J> Debug for KeySetManager<J>
where
	J: Jws,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("KeySetManager")
			.field("source", &self.shared.source.origin())
			.field(
				"current_kid",
				&self.shared.cache.load_full().map(|set| set.current_kid().to_owned()),
			)
			.field("periodic_reload", &self.is_reloading())
			.finish()
	}
}
impl<J> Drop for KeySetManager<J>
where
	J: Jws,
{
	fn drop(&mut self) {
		let handle = match self.reloader.get_mut() {
			Ok(slot) => slot.take(),
			Err(poisoned) => poisoned.into_inner().take(),
		};

		if let Some(handle) = handle {
			handle.abort();
		}
	}
}

/// Builder for [`KeySetManager`].
pub struct KeySetManagerBuilder<J>
where
	J: Jws,
{
	source: Box<dyn SecretSource>,
	jws: J,
	reload_interval: Option<Duration>,
}
impl<J> KeySetManagerBuilder<J>
where
	J: Jws,
{
	/// Swap the crypto capability.
	pub fn jws<K>(self, jws: K) -> KeySetManagerBuilder<K>
	where
		K: Jws,
	{
		KeySetManagerBuilder { source: self.source, jws, reload_interval: self.reload_interval }
	}

	/// Reload period; [`Duration::ZERO`] disables periodic reload.
	pub fn reload_interval(mut self, interval: Duration) -> Self {
		self.reload_interval = (!interval.is_zero()).then_some(interval);

		self
	}

	/// Reload period in seconds; `<= 0` disables periodic reload.
	pub fn reload_interval_seconds(self, seconds: i64) -> Self {
		self.reload_interval(Duration::from_secs(seconds.max(0) as u64))
	}

	/// Perform the initial load and start the reloader when an interval is set.
	///
	/// A failed initial load is fatal: there is no key material to serve. A periodic reloader
	/// needs a Tokio runtime on the calling thread.
	pub fn build(self) -> Result<KeySetManager<J>> {
		let shared = Arc::new(Shared::new(self.source, self.jws));

		shared.reload()?;

		let reloader = match self.reload_interval {
			Some(period) => {
				let runtime = Handle::try_current().map_err(|_| {
					Error::Configuration("Periodic key reload requires a Tokio runtime.".into())
				})?;

				tracing::info!(source = %shared.source.origin(), ?period, "key set reloader started");

				Some(runtime.spawn(run_reloader(shared.clone(), period)))
			},
			None => None,
		};

		Ok(KeySetManager { shared, reloader: Mutex::new(reloader) })
	}
}

/// Point-in-time description of the installed key set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySetStatus {
	/// Kid used for signing.
	pub current_kid: String,
	/// Configured grace kids, present or not.
	pub grace_kids: BTreeSet<String>,
	/// Number of keys in the document.
	pub key_count: usize,
	/// Kids currently accepted for verification.
	pub verification_kids: Vec<String>,
	/// When the installed set was built.
	pub loaded_at: DateTime<Utc>,
	/// Successful reloads, the initial load included.
	pub reloads: u64,
	/// Failed reload attempts.
	pub reload_failures: u64,
	/// Latency of the most recent successful reload.
	pub last_reload_micros: Option<u64>,
	/// Whether the background reloader is scheduled.
	pub periodic_reload: bool,
}

struct Shared<J>
where
	J: Jws,
{
	source: Box<dyn SecretSource>,
	jws: J,
	cache: ArcSwapOption<KeySet<J::Key>>,
	metrics: ReloadMetrics,
}
impl<J> Shared<J>
where
	J: Jws,
{
	fn new(source: Box<dyn SecretSource>, jws: J) -> Self {
		Self { source, jws, cache: ArcSwapOption::empty(), metrics: ReloadMetrics::default() }
	}

	#[tracing::instrument(skip(self), fields(source = %self.source.origin()))]
	fn reload(&self) -> Result<Arc<KeySet<J::Key>>> {
		let started = Instant::now();
		let parsed = self.source.load().and_then(|json| KeySet::parse(&json, &self.jws));

		match parsed {
			Ok(set) => {
				let set = Arc::new(set);
				let elapsed = started.elapsed();

				self.cache.store(Some(set.clone()));
				self.metrics.record_success(elapsed);

				metrics::record_reload_success(elapsed, set.verification_keys().len());

				tracing::debug!(
					current_kid = %set.current_kid(),
					grace = set.grace_kids().len(),
					keys = set.private_keys().len(),
					"key set installed"
				);

				Ok(set)
			},
			Err(err) => {
				self.metrics.record_failure();

				metrics::record_reload_error();

				Err(err)
			},
		}
	}
}

async fn run_reloader<J>(shared: Arc<Shared<J>>, period: Duration)
where
	J: Jws,
{
	// The initial load already ran; the first tick is one full period away.
	let mut ticker = time::interval_at(Instant::now() + period, period);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		let worker = shared.clone();

		match task::spawn_blocking(move || worker.reload()).await {
			Ok(Ok(_)) => {},
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "scheduled key set reload failed; keeping previous key set");
			},
			Err(err) => {
				tracing::warn!(error = %err, "scheduled key set reload did not complete");
			},
		}
	}
}
