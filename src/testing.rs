//! Deterministic stand-in for the crypto capability used by unit tests.

// crates.io
use base64::prelude::*;
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	jws::{Jws, KeyMaterial},
	token::claim::ClaimSet,
};

/// Signs by embedding the kid; verification only checks the kid is accepted.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FakeJws;
impl Jws for FakeJws {
	type Key = FakeKey;

	fn parse_key(&self, entry: &Value) -> Result<FakeKey> {
		let kid = entry.get("kid").and_then(Value::as_str);

		match entry.get("kty").and_then(Value::as_str) {
			Some("FAKE") => kid
				.map(|kid| FakeKey { kid: kid.to_owned() })
				.ok_or_else(|| Error::key_format(None, "Key entry is missing 'kid'.")),
			_ => Err(Error::key_format(kid, "Expected a FAKE key.")),
		}
	}

	fn sign(&self, claims: &ClaimSet, key: &FakeKey) -> Result<String> {
		let payload = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);

		Ok(format!("{}.{payload}.fake", key.kid))
	}

	fn verify(&self, token: &str, keys: &[FakeKey]) -> Result<ClaimSet> {
		let mut parts = token.split('.');
		let (Some(kid), Some(payload), Some("fake"), None) =
			(parts.next(), parts.next(), parts.next(), parts.next())
		else {
			return Err(Error::MalformedToken("Expected three segments.".into()));
		};
		let bytes = BASE64_URL_SAFE_NO_PAD
			.decode(payload)
			.map_err(|err| Error::MalformedToken(err.to_string()))?;
		let claims: ClaimSet =
			serde_json::from_slice(&bytes).map_err(|err| Error::MalformedToken(err.to_string()))?;

		if keys.iter().any(|key| key.kid == kid) {
			Ok(claims)
		} else {
			Err(Error::InvalidToken(format!("No accepted verification key for kid '{kid}'.")))
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FakeKey {
	pub(crate) kid: String,
}
impl KeyMaterial for FakeKey {
	type Public = FakeKey;

	fn kid(&self) -> &str {
		&self.kid
	}

	fn to_public(&self) -> FakeKey {
		self.clone()
	}
}

/// Key-set document for [`FakeJws`].
pub(crate) fn document(current: &str, grace: &[&str], kids: &[&str]) -> String {
	let keys: Vec<Value> = kids.iter().map(|kid| json!({ "kty": "FAKE", "kid": kid })).collect();

	json!({ "currentKid": current, "graceKids": grace, "keys": keys }).to_string()
}

/// Kid embedded in a [`FakeJws`] token.
pub(crate) fn signing_kid(token: &str) -> &str {
	token.split('.').next().unwrap_or_default()
}
