//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the token keyring crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Join(#[from] tokio::task::JoinError),

	#[error(transparent)]
	Jsonwebtoken(#[from] jsonwebtoken::errors::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),

	#[error("Configuration error: {0}")]
	Configuration(String),
	#[error("Key format error ({}): {reason}", .kid.as_deref().unwrap_or("no kid"))]
	KeyFormat { kid: Option<String>, reason: String },
	#[error("Key set has not been loaded.")]
	NotLoaded,
	#[error("Invalid token: {0}")]
	InvalidToken(String),
	#[error("Malformed token: {0}")]
	MalformedToken(String),
	#[error("Token is missing required field '{0}'.")]
	MissingField(&'static str),
	#[error("Invalid claim {field}: {reason}")]
	InvalidClaim { field: &'static str, reason: String },
	#[error("Token has expired.")]
	Expired,
	#[error("Secret source error: {0}")]
	SecretSource(String),
	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Whether the error came from decoding a token rather than from key or configuration state.
	pub fn is_decode_error(&self) -> bool {
		matches!(self, Self::InvalidToken(_) | Self::MalformedToken(_))
	}

	pub(crate) fn key_format(kid: Option<&str>, reason: impl Into<String>) -> Self {
		Self::KeyFormat { kid: kid.map(ToOwned::to_owned), reason: reason.into() }
	}
}
