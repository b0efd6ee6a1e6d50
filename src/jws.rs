//! Injected signing and verification capability.
//!
//! Key rotation and claim-shape rules never touch a concrete crypto library; they go through [`Jws`].
//! [`RsaJws`](rsa::RsaJws) is the production implementation.

pub mod rsa;

// crates.io
use jsonwebtoken::jwk::Jwk;
use serde_json::Value;
// self
use crate::{_prelude::*, token::claim::ClaimSet};

/// Public half of the key material handled by `J`.
pub type PublicKeyOf<J> = <<J as Jws>::Key as KeyMaterial>::Public;

/// Parsed key pair owned by a key set.
pub trait KeyMaterial: Clone + Send + Sync + 'static {
	/// Verification-only half of the key.
	type Public: Clone + Send + Sync + 'static;

	/// Key identifier.
	fn kid(&self) -> &str;

	/// Derive the verification half.
	fn to_public(&self) -> Self::Public;
}

/// Compact-serialised signer/verifier.
pub trait Jws: Send + Sync + 'static {
	/// Key type produced by [`parse_key`](Self::parse_key).
	type Key: KeyMaterial;

	/// Parse one entry of the key-set `keys` array.
	///
	/// Unsupported key types must fail with [`Error::KeyFormat`].
	fn parse_key(&self, entry: &Value) -> Result<Self::Key>;

	/// Sign the claim set, recording the key's `kid` in the token header.
	fn sign(&self, claims: &ClaimSet, key: &Self::Key) -> Result<String>;

	/// Check the signature against the accepted keys and return the decoded claims.
	///
	/// Structural failures map to [`Error::MalformedToken`], signature failures to
	/// [`Error::InvalidToken`]. Expiry is not checked here.
	fn verify(&self, token: &str, keys: &[PublicKeyOf<Self>]) -> Result<ClaimSet>;

	/// Render a public key as a JWK for publication, when the implementation supports it.
	fn public_jwk(&self, _key: &PublicKeyOf<Self>) -> Result<Option<Jwk>> {
		Ok(None)
	}
}
