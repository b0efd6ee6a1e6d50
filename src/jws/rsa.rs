//! RSA signing backed by `jsonwebtoken`, with private JWKs decoded through the `rsa` crate.

// std
use std::fmt::{Debug, Formatter, Result as FmtResult};
// crates.io
use base64::prelude::*;
use jsonwebtoken::{
	Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind, jwk::Jwk,
};
use rsa::{
	BigUint, RsaPrivateKey,
	pkcs1::EncodeRsaPrivateKey,
	traits::PublicKeyParts,
};
use serde::Deserialize;
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	jws::{Jws, KeyMaterial},
	token::claim::ClaimSet,
};

/// Smallest accepted modulus.
pub const MIN_MODULUS_BITS: usize = 2048;

/// RSA JWS implementation (RS256 unless configured otherwise).
#[derive(Clone, Debug)]
pub struct RsaJws {
	algorithm: Algorithm,
	validation: Validation,
}
impl RsaJws {
	/// Create an RS256 signer/verifier.
	pub fn new() -> Self {
		Self::build(Algorithm::RS256)
	}

	/// Use a different RSA algorithm (`RS*` or `PS*`).
	pub fn with_algorithm(algorithm: Algorithm) -> Result<Self> {
		match algorithm {
			Algorithm::RS256
			| Algorithm::RS384
			| Algorithm::RS512
			| Algorithm::PS256
			| Algorithm::PS384
			| Algorithm::PS512 => Ok(Self::build(algorithm)),
			other => Err(Error::Configuration(format!("{other:?} is not an RSA algorithm."))),
		}
	}

	/// Algorithm written into every token header.
	pub fn algorithm(&self) -> Algorithm {
		self.algorithm
	}

	fn build(algorithm: Algorithm) -> Self {
		let mut validation = Validation::new(algorithm);

		// Expiry is a separate operation; decode only proves the signature.
		validation.validate_exp = false;
		validation.validate_nbf = false;
		validation.validate_aud = false;
		validation.required_spec_claims.clear();

		Self { algorithm, validation }
	}
}
impl Default for RsaJws {
	fn default() -> Self {
		Self::new()
	}
}
impl Jws for RsaJws {
	type Key = RsaKey;

	fn parse_key(&self, entry: &Value) -> Result<RsaKey> {
		let kid = entry.get("kid").and_then(Value::as_str);
		let Some(kid) = kid.filter(|kid| !kid.is_empty()) else {
			return Err(Error::key_format(None, "Key entry is missing 'kid'."));
		};

		match entry.get("kty").and_then(Value::as_str) {
			Some("RSA") => {},
			Some(other) => {
				return Err(Error::key_format(
					Some(kid),
					format!("Expected an RSA key, found kty '{other}'."),
				));
			},
			None => return Err(Error::key_format(Some(kid), "Key entry is missing 'kty'.")),
		}

		let jwk = RsaPrivateJwk::deserialize(entry)
			.map_err(|err| Error::key_format(Some(kid), format!("Invalid RSA JWK: {err}.")))?;
		let private = jwk.to_private_key(kid)?;

		if private.size() * 8 < MIN_MODULUS_BITS {
			return Err(Error::key_format(
				Some(kid),
				format!("Modulus must be at least {MIN_MODULUS_BITS} bits."),
			));
		}

		let der = private
			.to_pkcs1_der()
			.map_err(|err| Error::key_format(Some(kid), format!("PKCS#1 encoding failed: {err}.")))?;
		let encoding = EncodingKey::from_rsa_der(der.as_bytes());
		let n = BASE64_URL_SAFE_NO_PAD.encode(private.n().to_bytes_be());
		let e = BASE64_URL_SAFE_NO_PAD.encode(private.e().to_bytes_be());
		let decoding = DecodingKey::from_rsa_components(&n, &e)
			.map_err(|err| Error::key_format(Some(kid), format!("Invalid public key: {err}.")))?;
		let kid: Arc<str> = Arc::from(kid);

		Ok(RsaKey {
			kid: kid.clone(),
			encoding: Arc::new(encoding),
			public: RsaPublicKey {
				kid,
				n: Arc::from(n),
				e: Arc::from(e),
				decoding: Arc::new(decoding),
			},
		})
	}

	fn sign(&self, claims: &ClaimSet, key: &RsaKey) -> Result<String> {
		let mut header = Header::new(self.algorithm);

		header.kid = Some(key.kid.to_string());

		Ok(jsonwebtoken::encode(&header, claims, &key.encoding)?)
	}

	fn verify(&self, token: &str, keys: &[RsaPublicKey]) -> Result<ClaimSet> {
		let header =
			jsonwebtoken::decode_header(token).map_err(|err| Error::MalformedToken(err.to_string()))?;
		let candidates: Vec<&RsaPublicKey> = match header.kid.as_deref() {
			Some(kid) => keys.iter().filter(|key| &*key.kid == kid).collect(),
			None => keys.iter().collect(),
		};

		if candidates.is_empty() {
			return Err(Error::InvalidToken(match header.kid {
				Some(kid) => format!("No accepted verification key for kid '{kid}'."),
				None => "No verification keys available.".into(),
			}));
		}

		let mut last_error = None;

		for key in candidates {
			match jsonwebtoken::decode::<ClaimSet>(token, &key.decoding, &self.validation) {
				Ok(data) => return Ok(data.claims),
				Err(err) => match err.kind() {
					ErrorKind::InvalidToken
					| ErrorKind::Base64(_)
					| ErrorKind::Json(_)
					| ErrorKind::Utf8(_) => return Err(Error::MalformedToken(err.to_string())),
					_ => last_error = Some(err),
				},
			}
		}

		Err(Error::InvalidToken(
			last_error
				.map(|err| err.to_string())
				.unwrap_or_else(|| "Signature verification failed.".into()),
		))
	}

	fn public_jwk(&self, key: &RsaPublicKey) -> Result<Option<Jwk>> {
		let jwk = serde_json::from_value(json!({
			"kty": "RSA",
			"use": "sig",
			"alg": self.algorithm,
			"kid": &*key.kid,
			"n": &*key.n,
			"e": &*key.e,
		}))?;

		Ok(Some(jwk))
	}
}

/// Parsed RSA key pair.
#[derive(Clone)]
pub struct RsaKey {
	kid: Arc<str>,
	encoding: Arc<EncodingKey>,
	public: RsaPublicKey,
}
impl Debug for RsaKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("RsaKey").field("kid", &self.kid).field("private", &"[hidden]").finish()
	}
}
impl KeyMaterial for RsaKey {
	type Public = RsaPublicKey;

	fn kid(&self) -> &str {
		&self.kid
	}

	fn to_public(&self) -> RsaPublicKey {
		self.public.clone()
	}
}

/// Verification half of an [`RsaKey`].
#[derive(Clone)]
pub struct RsaPublicKey {
	kid: Arc<str>,
	n: Arc<str>,
	e: Arc<str>,
	decoding: Arc<DecodingKey>,
}
impl RsaPublicKey {
	/// Key identifier.
	pub fn kid(&self) -> &str {
		&self.kid
	}

	/// Base64url modulus.
	pub fn modulus(&self) -> &str {
		&self.n
	}

	/// Base64url public exponent.
	pub fn exponent(&self) -> &str {
		&self.e
	}
}
impl Debug for RsaPublicKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("RsaPublicKey").field("kid", &self.kid).field("e", &self.e).finish()
	}
}

#[derive(Deserialize)]
struct RsaPrivateJwk {
	n: String,
	e: String,
	d: String,
	#[serde(default)]
	p: Option<String>,
	#[serde(default)]
	q: Option<String>,
}
impl RsaPrivateJwk {
	fn to_private_key(&self, kid: &str) -> Result<RsaPrivateKey> {
		let n = decode_component(&self.n, "n", kid)?;
		let e = decode_component(&self.e, "e", kid)?;
		let d = decode_component(&self.d, "d", kid)?;
		let primes = match (&self.p, &self.q) {
			(Some(p), Some(q)) =>
				vec![decode_component(p, "p", kid)?, decode_component(q, "q", kid)?],
			_ => Vec::new(),
		};
		let key = RsaPrivateKey::from_components(n, e, d, primes)
			.map_err(|err| Error::key_format(Some(kid), format!("Invalid RSA components: {err}.")))?;

		key.validate()
			.map_err(|err| Error::key_format(Some(kid), format!("RSA key failed validation: {err}.")))?;

		Ok(key)
	}
}

fn decode_component(value: &str, field: &str, kid: &str) -> Result<BigUint> {
	let bytes = BASE64_URL_SAFE_NO_PAD.decode(value.trim_end_matches('=')).map_err(|err| {
		Error::key_format(Some(kid), format!("Invalid base64url in '{field}': {err}."))
	})?;

	Ok(BigUint::from_bytes_be(&bytes))
}
