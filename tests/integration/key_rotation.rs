//! Key-set reload and zero-downtime rotation.

// std
use std::{fs, sync::Arc, time::Duration};
// crates.io
use jsonwebtoken::decode_header;
use jwt_keyring::{
	AsyncTokenService, Error, FileSecretSource, IssueRequest, KeySetManager, Result, SecretBackend,
	StaticSecretSource, TokenConfig, TokenService, TokenSettings,
};
use tempfile::NamedTempFile;

fn signing_kid(token: &str) -> String {
	decode_header(token).expect("header").kid.expect("kid")
}

#[test]
fn rotation_keeps_in_flight_tokens_valid() -> Result<()> {
	crate::init_tracing();

	let source = Arc::new(StaticSecretSource::new(crate::document("k1", &[], &["k1"])));
	let keys = Arc::new(KeySetManager::builder(source.clone()).build()?);
	let service = TokenService::new(keys.clone(), TokenSettings::default());
	let before = service.issue("alice")?;

	// Operator moves k1 into the grace window and introduces k2.
	source.replace(crate::document("k2", &["k1"], &["k1", "k2"]));
	keys.reload()?;

	let after = service.issue("alice")?;

	assert!(service.verify(&before));
	assert!(service.verify(&after));
	assert_eq!(signing_kid(&before), "k1");
	assert_eq!(signing_kid(&after), "k2");

	let status = keys.status()?;

	assert_eq!(status.current_kid, "k2");
	assert_eq!(status.verification_kids, vec!["k1".to_string(), "k2".to_string()]);
	assert_eq!(keys.public_jwks()?.keys.len(), 2);

	// Grace window closes.
	source.replace(crate::document("k2", &[], &["k2"]));
	keys.reload()?;

	assert!(!service.verify(&before));
	assert!(service.verify(&after));
	assert_eq!(keys.status()?.reloads, 3);

	Ok(())
}

#[test]
fn broken_update_keeps_serving_previous_keys() -> Result<()> {
	let source = Arc::new(StaticSecretSource::new(crate::document("k1", &[], &["k1"])));
	let keys = Arc::new(KeySetManager::builder(source.clone()).build()?);
	let service = TokenService::new(keys.clone(), TokenSettings::default());
	let token = service.issue("carol")?;

	source.replace(r#"{"keys":[]}"#);

	assert!(matches!(keys.reload(), Err(Error::Configuration(_))));

	source.replace(crate::document("k9", &[], &["k1"]));

	assert!(matches!(keys.reload(), Err(Error::Configuration(_))));
	assert!(service.verify(&token));
	assert_eq!(keys.status()?.reload_failures, 2);

	Ok(())
}

#[test]
fn missing_grace_key_only_narrows_the_accepted_set() -> Result<()> {
	let source = StaticSecretSource::new(crate::document("k2", &["k1", "retired"], &["k2", "k1"]));
	let keys = KeySetManager::builder(source).build()?;

	assert_eq!(keys.verification_keys()?.len(), 2);
	assert_eq!(keys.status()?.grace_kids.len(), 2);

	Ok(())
}

#[test]
fn configuration_wires_a_file_backed_service() -> Result<()> {
	let file = NamedTempFile::new().expect("temp file");

	fs::write(file.path(), crate::document("k3", &[], &["k3"])).expect("write keys");

	let config: TokenConfig = serde_json::from_value(serde_json::json!({
		"backend": "FILE",
		"file_path": file.path(),
		"reload_interval_seconds": 0,
		"issuer": "config-issuer",
		"default_claims": { "tenant": "acme" },
	}))?;

	assert_eq!(config.backend, SecretBackend::File);

	let service = config.token_service()?;
	let claims = service.claims(&service.issue("dave")?)?;

	assert_eq!(claims["iss"], "config-issuer");
	assert_eq!(claims["tenant"], "acme");
	assert!(!service.keys().is_reloading());

	Ok(())
}

#[tokio::test]
async fn background_reloader_follows_the_file() -> Result<()> {
	crate::init_tracing();

	let file = NamedTempFile::new().expect("temp file");

	fs::write(file.path(), crate::document("k1", &[], &["k1"])).expect("write keys");

	let keys = KeySetManager::builder(FileSecretSource::new(file.path()))
		.reload_interval(Duration::from_millis(50))
		.build()?;

	fs::write(file.path(), crate::document("k2", &["k1"], &["k1", "k2"])).expect("rewrite keys");

	let mut rotated = false;

	for _ in 0..200 {
		if keys.status()?.current_kid == "k2" {
			rotated = true;

			break;
		}

		tokio::time::sleep(Duration::from_millis(25)).await;
	}

	assert!(rotated, "reloader never installed k2: {:?}", keys.status()?);

	keys.shutdown();

	assert!(!keys.is_reloading());

	Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reads_never_observe_a_partial_key_set_during_reloads() -> Result<()> {
	let source = Arc::new(StaticSecretSource::new(crate::document("k1", &["k2"], &["k1", "k2"])));
	let keys = Arc::new(KeySetManager::builder(source.clone()).build()?);
	let service = AsyncTokenService::new(TokenService::new(keys.clone(), TokenSettings::default()));
	let workers: Vec<_> = (0..4)
		.map(|worker| {
			let service = service.clone();

			tokio::spawn(async move {
				for round in 0..20 {
					let token = service
						.issue(IssueRequest::new(format!("worker-{worker}")).claim("round", round))
						.await?;

					assert!(service.verify(token).await?, "token failed to verify mid-rotation");
				}

				Ok::<_, Error>(())
			})
		})
		.collect();

	for round in 0..20 {
		let json = if round % 2 == 0 {
			crate::document("k2", &["k1"], &["k1", "k2"])
		} else {
			crate::document("k1", &["k2"], &["k1", "k2"])
		};

		source.replace(json);

		let keys = keys.clone();

		tokio::task::spawn_blocking(move || keys.reload()).await??;
	}

	for worker in workers {
		worker.await??;
	}

	Ok(())
}
