//! Process-wide issuance settings and explicit fail-open policies.

// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::token::claim::ClaimSet;

/// Default token lifetime.
pub const DEFAULT_EXPIRE_SECONDS: i64 = 3600;

/// What to do when a token's `type` claim is absent or not a known type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTypePolicy {
	/// Treat the token as [`TokenType::Access`](crate::token::claim::TokenType::Access).
	#[default]
	DefaultAccess,
	/// Fail the lookup.
	Reject,
}

/// Whether `refresh` accepts a token whose `exp` has already passed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredRefreshPolicy {
	/// Re-issue regardless of the old expiry.
	#[default]
	Allow,
	/// Fail with [`Error::Expired`](crate::Error::Expired).
	Reject,
}

/// Issuance settings shared by every token operation.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenSettings {
	/// Value stamped into `iss`.
	pub issuer: String,
	/// Lifetime used when a request does not specify one.
	pub expire_seconds: i64,
	/// Claims merged into every token; request claims win on collision.
	pub default_claims: ClaimSet,
	/// Handling of absent or unknown `type`.
	pub missing_type: MissingTypePolicy,
	/// Handling of expired tokens on refresh.
	pub expired_refresh: ExpiredRefreshPolicy,
}
impl TokenSettings {
	/// Settings with the given issuer and defaults elsewhere.
	pub fn new(issuer: impl Into<String>) -> Self {
		Self { issuer: issuer.into(), ..Default::default() }
	}

	/// Override the default lifetime.
	pub fn with_expire_seconds(mut self, expire_seconds: i64) -> Self {
		self.expire_seconds = expire_seconds;

		self
	}

	/// Add a default claim.
	pub fn with_default_claim(
		mut self,
		name: impl Into<String>,
		value: impl Into<serde_json::Value>,
	) -> Self {
		self.default_claims.insert(name.into(), value.into());

		self
	}

	/// Set the missing-type policy.
	pub fn with_missing_type(mut self, policy: MissingTypePolicy) -> Self {
		self.missing_type = policy;

		self
	}

	/// Set the expired-refresh policy.
	pub fn with_expired_refresh(mut self, policy: ExpiredRefreshPolicy) -> Self {
		self.expired_refresh = policy;

		self
	}
}
impl Default for TokenSettings {
	fn default() -> Self {
		Self {
			issuer: String::new(),
			expire_seconds: DEFAULT_EXPIRE_SECONDS,
			default_claims: ClaimSet::new(),
			missing_type: MissingTypePolicy::default(),
			expired_refresh: ExpiredRefreshPolicy::default(),
		}
	}
}
