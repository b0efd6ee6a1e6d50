//! Deserialisable configuration surface and the wiring it drives.

// std
use std::path::PathBuf;
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::{
	_prelude::*,
	jws::rsa::RsaJws,
	keys::manager::KeySetManager,
	source::{EnvSecretSource, FileSecretSource, SecretSource},
	token::{
		claim::{self, ClaimSet},
		service::TokenService,
		settings::{DEFAULT_EXPIRE_SECONDS, ExpiredRefreshPolicy, MissingTypePolicy, TokenSettings},
	},
};

/// Environment variable read by the default [`SecretBackend::Env`] backend.
pub const DEFAULT_ENV_VAR: &str = "STARTER_TOKEN_PRIVATE_JWKS_JSON";
/// Default period between background key reloads.
pub const DEFAULT_RELOAD_INTERVAL_SECONDS: i64 = 300;

/// Where the key-set JSON comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecretBackend {
	/// Environment variable named by [`TokenConfig::env_var`].
	#[default]
	Env,
	/// Local file at [`TokenConfig::file_path`].
	File,
}

/// Token and key-set configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
	/// Key-set JSON backend.
	pub backend: SecretBackend,
	/// Variable read by the `ENV` backend.
	pub env_var: String,
	/// Path read by the `FILE` backend.
	pub file_path: Option<PathBuf>,
	/// Background reload period; `<= 0` loads once at startup only.
	pub reload_interval_seconds: i64,
	/// Value stamped into `iss`.
	pub issuer: String,
	/// Default token lifetime.
	pub expire_seconds: i64,
	/// Claims merged into every issued token.
	pub default_claims: ClaimSet,
	/// Handling of absent or unknown `type` claims.
	pub missing_type: MissingTypePolicy,
	/// Handling of expired tokens presented for refresh.
	pub expired_refresh: ExpiredRefreshPolicy,
}
impl TokenConfig {
	/// Check field invariants before anything is wired.
	pub fn validate(&self) -> Result<()> {
		match self.backend {
			SecretBackend::Env if self.env_var.trim().is_empty() =>
				return Err(Error::Validation {
					field: "env_var",
					reason: "Must be non-empty for the ENV backend.".into(),
				}),
			SecretBackend::File if self.file_path.is_none() =>
				return Err(Error::Validation {
					field: "file_path",
					reason: "Is required for the FILE backend.".into(),
				}),
			_ => {},
		}
		if self.expire_seconds <= 0 {
			return Err(Error::Validation {
				field: "expire_seconds",
				reason: "Must be greater than zero.".into(),
			});
		}
		if let Some(name) = claim::RESERVED.iter().find(|name| self.default_claims.contains_key(**name))
		{
			return Err(Error::Validation {
				field: "default_claims",
				reason: format!("Reserved claim '{name}' cannot be defaulted."),
			});
		}

		Ok(())
	}

	/// Issuance settings derived from this configuration.
	pub fn settings(&self) -> TokenSettings {
		TokenSettings {
			issuer: self.issuer.clone(),
			expire_seconds: self.expire_seconds,
			default_claims: self.default_claims.clone(),
			missing_type: self.missing_type,
			expired_refresh: self.expired_refresh,
		}
	}

	/// Source selected by [`backend`](Self::backend).
	pub fn secret_source(&self) -> Result<Box<dyn SecretSource>> {
		match (self.backend, &self.file_path) {
			(SecretBackend::Env, _) => Ok(Box::new(EnvSecretSource::new(&self.env_var))),
			(SecretBackend::File, Some(path)) => Ok(Box::new(FileSecretSource::new(path))),
			(SecretBackend::File, None) => Err(Error::Validation {
				field: "file_path",
				reason: "Is required for the FILE backend.".into(),
			}),
		}
	}

	/// Reload period, or `None` when periodic reload is disabled.
	pub fn reload_interval(&self) -> Option<Duration> {
		(self.reload_interval_seconds > 0)
			.then(|| Duration::from_secs(self.reload_interval_seconds as u64))
	}

	/// Validate, load the key set, and start the reloader when configured.
	///
	/// A positive reload interval needs a Tokio runtime on the calling thread.
	pub fn key_set_manager(&self) -> Result<KeySetManager<RsaJws>> {
		self.validate()?;

		KeySetManager::builder(self.secret_source()?)
			.reload_interval(self.reload_interval().unwrap_or(Duration::ZERO))
			.build()
	}

	/// Fully wired token service.
	pub fn token_service(&self) -> Result<TokenService<RsaJws>> {
		Ok(TokenService::new(Arc::new(self.key_set_manager()?), self.settings()))
	}
}
impl Default for TokenConfig {
	fn default() -> Self {
		Self {
			backend: SecretBackend::default(),
			env_var: DEFAULT_ENV_VAR.into(),
			file_path: None,
			reload_interval_seconds: DEFAULT_RELOAD_INTERVAL_SECONDS,
			issuer: String::new(),
			expire_seconds: DEFAULT_EXPIRE_SECONDS,
			default_claims: ClaimSet::new(),
			missing_type: MissingTypePolicy::default(),
			expired_refresh: ExpiredRefreshPolicy::default(),
		}
	}
}
