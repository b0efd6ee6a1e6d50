//! Token lifecycle: issue, verify, inspect, refresh.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	jws::{Jws, rsa::RsaJws},
	keys::manager::KeySetManager,
	token::{
		claim::{self, Claim, ClaimSet, TokenType},
		codec::TokenCodec,
		settings::{ExpiredRefreshPolicy, MissingTypePolicy, TokenSettings},
	},
};

/// Parameters for [`TokenService::issue`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IssueRequest {
	/// Value of `sub`.
	pub subject: String,
	/// Value of `type`.
	pub token_type: TokenType,
	/// Lifetime in seconds; the configured default when `None`. Negative values yield expired tokens.
	pub expires_in: Option<i64>,
	/// Extra claims; they override default claims but never reserved ones.
	pub claims: ClaimSet,
}
impl IssueRequest {
	/// Access token for `subject` with the default lifetime.
	pub fn new(subject: impl Into<String>) -> Self {
		Self { subject: subject.into(), ..Default::default() }
	}

	/// Set the token type.
	pub fn token_type(mut self, token_type: TokenType) -> Self {
		self.token_type = token_type;

		self
	}

	/// Set the lifetime in seconds.
	pub fn expires_in(mut self, seconds: i64) -> Self {
		self.expires_in = Some(seconds);

		self
	}

	/// Add one extra claim.
	pub fn claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.claims.insert(name.into(), value.into());

		self
	}

	/// Add every claim from `claims`.
	pub fn claims(mut self, claims: ClaimSet) -> Self {
		self.claims.extend(claims);

		self
	}
}
impl From<&str> for IssueRequest {
	fn from(subject: &str) -> Self {
		Self::new(subject)
	}
}
impl From<String> for IssueRequest {
	fn from(subject: String) -> Self {
		Self::new(subject)
	}
}

/// Public token lifecycle API.
///
/// Every call is a pure function of the token, the manager's current key set, and the settings.
/// Yes/no questions ([`verify`](Self::verify), [`is_expired`](Self::is_expired),
/// [`validate_subject`](Self::validate_subject), [`validate_claim`](Self::validate_claim)) fold
/// decode failures into their safe answer; the data-returning operations propagate them.
pub struct TokenService<J = RsaJws>
where
	J: Jws,
{
	codec: TokenCodec<J>,
}
impl<J> TokenService<J>
where
	J: Jws,
{
	/// Build a service over a shared manager.
	pub fn new(keys: Arc<KeySetManager<J>>, settings: impl Into<Arc<TokenSettings>>) -> Self {
		Self { codec: TokenCodec::new(keys, settings.into()) }
	}

	/// Issuance settings.
	pub fn settings(&self) -> &TokenSettings {
		self.codec.settings()
	}

	/// Key-set manager backing this service.
	pub fn keys(&self) -> &Arc<KeySetManager<J>> {
		self.codec.keys()
	}

	/// Encode/decode boundary used by this service.
	pub fn codec(&self) -> &TokenCodec<J> {
		&self.codec
	}

	/// Sign a new token.
	pub fn issue(&self, request: impl Into<IssueRequest>) -> Result<String> {
		let request = request.into();
		let expires_in = request.expires_in.unwrap_or(self.settings().expire_seconds);

		self.codec.encode(&request.subject, request.token_type, expires_in, &request.claims)
	}

	/// Full decoded claim set.
	pub fn claims(&self, token: &str) -> Result<ClaimSet> {
		self.codec.decode(token)
	}

	/// `true` when `exp` is absent, unreadable, or in the past, and when the token does not decode.
	pub fn is_expired(&self, token: &str) -> bool {
		let Ok(claims) = self.codec.decode(token) else {
			return true;
		};

		match claims.get(claim::EXPIRATION).and_then(claim::numeric_date) {
			Some(expiration) => expiration < Utc::now(),
			None => true,
		}
	}

	/// Whether the signature checks out against the accepted keys.
	pub fn verify(&self, token: &str) -> bool {
		self.codec.decode(token).is_ok()
	}

	/// Token type, resolved through the configured [`MissingTypePolicy`].
	pub fn token_type(&self, token: &str) -> Result<TokenType> {
		let claims = self.codec.decode(token)?;

		self.resolve_type(&claims)
	}

	/// Best-effort summary; absent `sub`, `iat`, or `exp` fall back to empty/epoch.
	pub fn token_info(&self, token: &str) -> Result<Claim> {
		let claims = self.codec.decode(token)?;
		let token_type = self.resolve_type(&claims)?;
		let date = |name: &str| {
			claims.get(name).and_then(claim::numeric_date).unwrap_or(DateTime::UNIX_EPOCH)
		};

		Ok(Claim {
			subject: claims.get(claim::SUBJECT).and_then(claim::claim_text).unwrap_or_default(),
			token_type,
			issued_at: date(claim::ISSUED_AT),
			expiration: date(claim::EXPIRATION),
			claims,
		})
	}

	/// Whether `sub` equals `expected`; `false` when the token does not decode.
	pub fn validate_subject(&self, token: &str, expected: &str) -> bool {
		self.validate_claim(token, claim::SUBJECT, expected)
	}

	/// Whether claim `name` is the string `expected`; `false` when the token does not decode.
	pub fn validate_claim(&self, token: &str, name: &str, expected: &str) -> bool {
		self.codec
			.decode(token)
			.is_ok_and(|claims| matches!(claims.get(name), Some(Value::String(value)) if value == expected))
	}

	/// Re-issue a token with the same subject, type, and custom claims and a fresh time window.
	///
	/// Unlike the inspection operations this requires `sub` and a valid `type`. Whether an already
	/// expired token may be refreshed is decided by [`ExpiredRefreshPolicy`].
	pub fn refresh(&self, token: &str, expires_in: i64) -> Result<String> {
		let mut claims = self.codec.decode(token)?;
		let subject = claims
			.get(claim::SUBJECT)
			.and_then(claim::claim_text)
			.ok_or(Error::MissingField(claim::SUBJECT))?;
		let token_type = claims
			.get(claim::TYPE)
			.and_then(claim::claim_text)
			.ok_or(Error::MissingField(claim::TYPE))?
			.parse::<TokenType>()?;

		if self.settings().expired_refresh == ExpiredRefreshPolicy::Reject {
			let expiration = claims.get(claim::EXPIRATION).and_then(claim::numeric_date);

			if expiration.is_none_or(|expiration| expiration < Utc::now()) {
				return Err(Error::Expired);
			}
		}

		for name in claim::REFRESH_STRIPPED {
			claims.remove(name);
		}

		self.codec.encode(&subject, token_type, expires_in, &claims)
	}

	fn resolve_type(&self, claims: &ClaimSet) -> Result<TokenType> {
		let raw = claims.get(claim::TYPE).and_then(claim::claim_text);

		match (self.settings().missing_type, raw) {
			(MissingTypePolicy::DefaultAccess, raw) =>
				Ok(raw.and_then(|raw| raw.parse().ok()).unwrap_or_default()),
			(MissingTypePolicy::Reject, Some(raw)) => raw.parse(),
			(MissingTypePolicy::Reject, None) => Err(Error::MissingField(claim::TYPE)),
		}
	}
}
impl<J> Clone for TokenService<J>
where
	J: Jws,
{
	fn clone(&self) -> Self {
		Self { codec: self.codec.clone() }
	}
}
