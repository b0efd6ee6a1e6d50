//! Signed token lifecycle (issue, verify, inspect, refresh) over a hot-reloaded key set with
//! zero-downtime rotation.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod jws;
pub mod keys;
pub mod metrics;
pub mod source;
pub mod token;

mod error;
#[cfg(test)] mod testing;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, TimeDelta, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	config::{SecretBackend, TokenConfig},
	error::{Error, Result},
	jws::{
		Jws, KeyMaterial,
		rsa::{RsaJws, RsaKey, RsaPublicKey},
	},
	keys::{
		manager::{KeySetManager, KeySetManagerBuilder, KeySetStatus},
		set::KeySet,
	},
	source::{EnvSecretSource, FileSecretSource, SecretSource, StaticSecretSource},
	token::{
		claim::{Claim, ClaimSet, TokenType},
		codec::TokenCodec,
		nonblocking::AsyncTokenService,
		service::{IssueRequest, TokenService},
		settings::{ExpiredRefreshPolicy, MissingTypePolicy, TokenSettings},
	},
};
