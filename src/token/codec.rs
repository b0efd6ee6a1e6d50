//! Claim-set assembly and the encode/decode boundary over the key-set manager.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	jws::Jws,
	keys::manager::KeySetManager,
	metrics::{self, RejectReason},
	token::{
		claim::{self, ClaimSet, TokenType},
		settings::TokenSettings,
	},
};

/// Translates between claim sets and signed token strings.
///
/// Holds no state of its own; every call reads the manager's current snapshot.
pub struct TokenCodec<J>
where
	J: Jws,
{
	keys: Arc<KeySetManager<J>>,
	settings: Arc<TokenSettings>,
}
impl<J> TokenCodec<J>
where
	J: Jws,
{
	/// Bind a codec to a manager and settings.
	pub fn new(keys: Arc<KeySetManager<J>>, settings: Arc<TokenSettings>) -> Self {
		Self { keys, settings }
	}

	/// Key-set manager in use.
	pub fn keys(&self) -> &Arc<KeySetManager<J>> {
		&self.keys
	}

	/// Issuance settings in use.
	pub fn settings(&self) -> &Arc<TokenSettings> {
		&self.settings
	}

	/// Assemble and sign a claim set with the active key.
	pub fn encode(
		&self,
		subject: &str,
		token_type: TokenType,
		expires_in: i64,
		extra: &ClaimSet,
	) -> Result<String> {
		let claims = assemble(&self.settings, subject, token_type, expires_in, extra, Utc::now())?;
		let set = self.keys.current_key_set()?;
		let token = self.keys.jws().sign(&claims, set.active())?;

		metrics::record_token_issued(token_type);

		Ok(token)
	}

	/// Verify `token` against the accepted keys and return its claims.
	pub fn decode(&self, token: &str) -> Result<ClaimSet> {
		let set = self.keys.current_key_set()?;

		self.keys.jws().verify(token, set.verification_keys()).inspect_err(|err| {
			let reason = match err {
				Error::MalformedToken(_) => RejectReason::Malformed,
				_ => RejectReason::Invalid,
			};

			metrics::record_token_rejected(reason);

			tracing::debug!(?reason, error = %err, "token rejected");
		})
	}
}
impl<J> Clone for TokenCodec<J>
where
	J: Jws,
{
	fn clone(&self) -> Self {
		Self { keys: self.keys.clone(), settings: self.settings.clone() }
	}
}

/// Build the claim set for a new token issued at `now`.
///
/// Precedence, lowest first: default claims, `extra`, then the reserved claims.
pub fn assemble(
	settings: &TokenSettings,
	subject: &str,
	token_type: TokenType,
	expires_in: i64,
	extra: &ClaimSet,
	now: DateTime<Utc>,
) -> Result<ClaimSet> {
	let expiration = TimeDelta::try_seconds(expires_in)
		.and_then(|lifetime| now.checked_add_signed(lifetime))
		.ok_or_else(|| Error::InvalidClaim {
			field: claim::EXPIRATION,
			reason: format!("Lifetime of {expires_in} seconds is out of range."),
		})?;
	let mut claims = settings.default_claims.clone();

	claims.extend(extra.iter().map(|(name, value)| (name.clone(), value.clone())));
	claims.insert(claim::ISSUER.into(), Value::from(settings.issuer.as_str()));
	claims.insert(claim::ISSUED_AT.into(), Value::from(now.timestamp()));
	claims.insert(claim::EXPIRATION.into(), Value::from(expiration.timestamp()));
	claims.insert(claim::SUBJECT.into(), Value::from(subject));
	claims.insert(claim::TYPE.into(), Value::from(token_type.as_str()));

	Ok(claims)
}
