//! Claim payload types and reserved claim names.

// std
use std::{
	fmt::{Display, Formatter, Result as FmtResult},
	str::FromStr,
};
// crates.io
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Decoded claim mapping, reserved fields included.
pub type ClaimSet = Map<String, Value>;

/// Issuer claim.
pub const ISSUER: &str = "iss";
/// Issued-at claim (seconds since epoch).
pub const ISSUED_AT: &str = "iat";
/// Expiration claim (seconds since epoch).
pub const EXPIRATION: &str = "exp";
/// Not-before claim; never written, stripped on refresh.
pub const NOT_BEFORE: &str = "nbf";
/// Subject claim.
pub const SUBJECT: &str = "sub";
/// Token type claim.
pub const TYPE: &str = "type";

/// Claims computed fresh on every issuance; callers and defaults cannot override them.
pub const RESERVED: [&str; 5] = [ISSUER, ISSUED_AT, EXPIRATION, SUBJECT, TYPE];
/// Claims dropped from the previous token before a refresh re-issues it.
pub const REFRESH_STRIPPED: [&str; 5] = [ISSUED_AT, EXPIRATION, NOT_BEFORE, SUBJECT, TYPE];

/// Token purpose carried in the `type` claim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
	/// End-user access token.
	#[default]
	Access,
	/// Long-lived token exchanged for new access tokens.
	Refresh,
	/// Service-to-service token.
	Service,
}
impl TokenType {
	/// Wire name written into the `type` claim.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Access => "ACCESS",
			Self::Refresh => "REFRESH",
			Self::Service => "SERVICE",
		}
	}
}
impl Display for TokenType {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for TokenType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"ACCESS" => Ok(Self::Access),
			"REFRESH" => Ok(Self::Refresh),
			"SERVICE" => Ok(Self::Service),
			other => Err(Error::InvalidClaim {
				field: TYPE,
				reason: format!("Unknown token type '{other}'."),
			}),
		}
	}
}

/// Best-effort summary of a decoded token.
#[derive(Clone, Debug, PartialEq)]
pub struct Claim {
	/// `sub`, or empty when absent.
	pub subject: String,
	/// Resolved token type.
	pub token_type: TokenType,
	/// `iat`, or the Unix epoch when absent.
	pub issued_at: DateTime<Utc>,
	/// `exp`, or the Unix epoch when absent.
	pub expiration: DateTime<Utc>,
	/// Full decoded claim set.
	pub claims: ClaimSet,
}

/// Interpret a JSON value as a JWT NumericDate.
pub fn numeric_date(value: &Value) -> Option<DateTime<Utc>> {
	if let Some(secs) = value.as_i64() {
		return DateTime::from_timestamp(secs, 0);
	}

	let secs = value.as_f64()?;

	if !secs.is_finite() {
		return None;
	}

	let whole = secs.floor();

	DateTime::from_timestamp(whole as i64, ((secs - whole) * 1e9) as u32)
}

/// Render a claim as text the way the `sub` summary expects.
pub(crate) fn claim_text(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(s) => Some(s.clone()),
		other => Some(other.to_string()),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn token_type_wire_names_are_exact() {
		assert_eq!(TokenType::Service.to_string(), "SERVICE");
		assert_eq!("REFRESH".parse::<TokenType>().expect("known"), TokenType::Refresh);
		assert!("access".parse::<TokenType>().is_err());
		assert_eq!(serde_json::to_value(TokenType::Access).expect("serialize"), json!("ACCESS"));
	}

	#[test]
	fn numeric_dates_accept_integers_and_fractions() {
		assert_eq!(numeric_date(&json!(0)), Some(DateTime::UNIX_EPOCH));
		assert_eq!(numeric_date(&json!(10.5)).map(|dt| dt.timestamp()), Some(10));
		assert_eq!(numeric_date(&json!("10")), None);
	}

	#[test]
	fn reserved_and_stripped_sets_overlap_on_identity() {
		for name in [ISSUED_AT, EXPIRATION, SUBJECT, TYPE] {
			assert!(RESERVED.contains(&name));
			assert!(REFRESH_STRIPPED.contains(&name));
		}

		assert!(!RESERVED.contains(&NOT_BEFORE));
		assert!(!REFRESH_STRIPPED.contains(&ISSUER));
	}
}
