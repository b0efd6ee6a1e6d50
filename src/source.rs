//! Origins of the private key-set JSON.
//!
//! A source is a pure read: it returns the raw JSON document every time it is asked and never caches.
//! Parsing and caching belong to [`KeySetManager`](crate::keys::manager::KeySetManager).

// std
use std::{
	env,
	fmt::{Debug, Formatter, Result as FmtResult},
	fs,
	path::PathBuf,
};
// crates.io
use arc_swap::ArcSwap;
// self
use crate::_prelude::*;

/// Supplies the raw JSON description of the private key set.
pub trait SecretSource: Send + Sync {
	/// Read the current key-set JSON.
	fn load(&self) -> Result<String>;

	/// Human-readable origin used in logs (never contains key material).
	fn origin(&self) -> String;
}
impl<T> SecretSource for Arc<T>
where
	T: SecretSource + ?Sized,
{
	fn load(&self) -> Result<String> {
		(**self).load()
	}

	fn origin(&self) -> String {
		(**self).origin()
	}
}
impl<T> SecretSource for Box<T>
where
	T: SecretSource + ?Sized,
{
	fn load(&self) -> Result<String> {
		(**self).load()
	}

	fn origin(&self) -> String {
		(**self).origin()
	}
}

/// Reads key-set JSON from an environment variable.
#[derive(Clone, Debug)]
pub struct EnvSecretSource {
	var: String,
}
impl EnvSecretSource {
	/// Create a source bound to the given variable name.
	pub fn new(var: impl Into<String>) -> Self {
		Self { var: var.into() }
	}

	/// Name of the environment variable consulted.
	pub fn var(&self) -> &str {
		&self.var
	}
}
impl SecretSource for EnvSecretSource {
	fn load(&self) -> Result<String> {
		env::var(&self.var).map_err(|err| match err {
			env::VarError::NotPresent =>
				Error::SecretSource(format!("Environment variable {} is not set.", self.var)),
			env::VarError::NotUnicode(_) => Error::SecretSource(format!(
				"Environment variable {} does not contain valid UTF-8.",
				self.var
			)),
		})
	}

	fn origin(&self) -> String {
		format!("env:{}", self.var)
	}
}

/// Reads key-set JSON from a local file on every load.
#[derive(Clone, Debug)]
pub struct FileSecretSource {
	path: PathBuf,
}
impl FileSecretSource {
	/// Create a source reading the given path.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}
impl SecretSource for FileSecretSource {
	fn load(&self) -> Result<String> {
		fs::read_to_string(&self.path).map_err(|err| {
			Error::SecretSource(format!("Failed to read {}: {err}.", self.path.display()))
		})
	}

	fn origin(&self) -> String {
		format!("file:{}", self.path.display())
	}
}

/// In-memory key-set JSON that can be replaced at runtime.
///
/// Hosts that receive key material through their own channel push updates with [`replace`](Self::replace);
/// the next reload picks them up.
pub struct StaticSecretSource {
	json: ArcSwap<String>,
}
impl StaticSecretSource {
	/// Create a source holding the given JSON document.
	pub fn new(json: impl Into<String>) -> Self {
		Self { json: ArcSwap::from_pointee(json.into()) }
	}

	/// Swap in a new JSON document.
	pub fn replace(&self, json: impl Into<String>) {
		self.json.store(Arc::new(json.into()));
	}
}
impl Debug for StaticSecretSource {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("StaticSecretSource").field("json", &"[redacted]").finish()
	}
}
impl SecretSource for StaticSecretSource {
	fn load(&self) -> Result<String> {
		Ok(self.json.load().as_ref().clone())
	}

	fn origin(&self) -> String {
		"static".into()
	}
}
