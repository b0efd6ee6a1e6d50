//! Async adapter over [`TokenService`] for callers running on a Tokio executor.

// crates.io
use tokio::task;
// self
use crate::{
	_prelude::*,
	jws::{Jws, rsa::RsaJws},
	token::{
		claim::{Claim, ClaimSet, TokenType},
		service::{IssueRequest, TokenService},
	},
};

/// Runs each [`TokenService`] operation on Tokio's blocking pool.
///
/// RSA signing is CPU-bound; keeping it off the async workers avoids stalling other tasks. Only
/// the calling convention differs from the wrapped service.
pub struct AsyncTokenService<J = RsaJws>
where
	J: Jws,
{
	inner: TokenService<J>,
}
impl<J> AsyncTokenService<J>
where
	J: Jws,
{
	/// Wrap a synchronous service.
	pub fn new(inner: TokenService<J>) -> Self {
		Self { inner }
	}

	/// Wrapped synchronous service.
	pub fn blocking(&self) -> &TokenService<J> {
		&self.inner
	}

	/// See [`TokenService::issue`].
	pub async fn issue(&self, request: impl Into<IssueRequest>) -> Result<String> {
		let request = request.into();

		self.run(move |service| service.issue(request)).await?
	}

	/// See [`TokenService::claims`].
	pub async fn claims(&self, token: impl Into<String>) -> Result<ClaimSet> {
		let token = token.into();

		self.run(move |service| service.claims(&token)).await?
	}

	/// See [`TokenService::is_expired`].
	pub async fn is_expired(&self, token: impl Into<String>) -> Result<bool> {
		let token = token.into();

		self.run(move |service| service.is_expired(&token)).await
	}

	/// See [`TokenService::verify`].
	pub async fn verify(&self, token: impl Into<String>) -> Result<bool> {
		let token = token.into();

		self.run(move |service| service.verify(&token)).await
	}

	/// See [`TokenService::token_type`].
	pub async fn token_type(&self, token: impl Into<String>) -> Result<TokenType> {
		let token = token.into();

		self.run(move |service| service.token_type(&token)).await?
	}

	/// See [`TokenService::token_info`].
	pub async fn token_info(&self, token: impl Into<String>) -> Result<Claim> {
		let token = token.into();

		self.run(move |service| service.token_info(&token)).await?
	}

	/// See [`TokenService::validate_subject`].
	pub async fn validate_subject(
		&self,
		token: impl Into<String>,
		expected: impl Into<String>,
	) -> Result<bool> {
		let (token, expected) = (token.into(), expected.into());

		self.run(move |service| service.validate_subject(&token, &expected)).await
	}

	/// See [`TokenService::validate_claim`].
	pub async fn validate_claim(
		&self,
		token: impl Into<String>,
		name: impl Into<String>,
		expected: impl Into<String>,
	) -> Result<bool> {
		let (token, name, expected) = (token.into(), name.into(), expected.into());

		self.run(move |service| service.validate_claim(&token, &name, &expected)).await
	}

	/// See [`TokenService::refresh`].
	pub async fn refresh(&self, token: impl Into<String>, expires_in: i64) -> Result<String> {
		let token = token.into();

		self.run(move |service| service.refresh(&token, expires_in)).await?
	}

	async fn run<T, F>(&self, f: F) -> Result<T>
	where
		T: Send + 'static,
		F: FnOnce(&TokenService<J>) -> T + Send + 'static,
	{
		let service = self.inner.clone();

		Ok(task::spawn_blocking(move || f(&service)).await?)
	}
}
impl<J> Clone for AsyncTokenService<J>
where
	J: Jws,
{
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<J> From<TokenService<J>> for AsyncTokenService<J>
where
	J: Jws,
{
	fn from(inner: TokenService<J>) -> Self {
		Self::new(inner)
	}
}
