//! Issue, verify, inspect, and refresh against RS256 keys.

// std
use std::sync::Arc;
// crates.io
use jsonwebtoken::{DecodingKey, Validation, jwk::JwkSet};
use jwt_keyring::{
	ClaimSet, Error, IssueRequest, Jws, KeySetManager, Result, StaticSecretSource, TokenService,
	TokenSettings, TokenType,
};
use serde_json::json;

fn service() -> TokenService {
	crate::init_tracing();

	let source = StaticSecretSource::new(crate::document("k1", &[], &["k1"]));
	let keys = KeySetManager::builder(source).build().expect("initial load");

	TokenService::new(Arc::new(keys), TokenSettings::new("https://auth.example"))
}

#[test]
fn issued_tokens_verify_and_round_trip_claims() -> Result<()> {
	let service = service();
	let token = service.issue(
		IssueRequest::new("svc-billing").token_type(TokenType::Service).claim("role", "admin"),
	)?;

	assert!(service.verify(&token));
	assert_eq!(service.token_type(&token)?, TokenType::Service);

	let claims = service.claims(&token)?;

	assert_eq!(claims["role"], json!("admin"));
	assert_eq!(claims["sub"], json!("svc-billing"));
	assert_eq!(claims["iss"], json!("https://auth.example"));
	assert!(claims["iat"].as_i64() <= claims["exp"].as_i64());

	Ok(())
}

#[test]
fn expiry_is_checked_separately_from_decoding() -> Result<()> {
	let service = service();
	let expired = service.issue(IssueRequest::new("u").expires_in(-1))?;
	let fresh = service.issue(IssueRequest::new("u").expires_in(3600))?;

	assert!(service.is_expired(&expired));
	assert!(service.verify(&expired));
	assert!(!service.is_expired(&fresh));

	Ok(())
}

#[test]
fn refresh_keeps_identity_and_extends_the_window() -> Result<()> {
	let service = service();
	let original = service.issue(IssueRequest::new("alice").expires_in(10).claim("x", "1"))?;
	let refreshed = service.refresh(&original, 20)?;
	let before = service.claims(&original)?;
	let after = service.claims(&refreshed)?;

	assert_eq!(after["sub"], json!("alice"));
	assert_eq!(after["type"], json!("ACCESS"));
	assert_eq!(after["x"], json!("1"));
	assert!(after["exp"].as_i64() > before["exp"].as_i64());

	Ok(())
}

#[test]
fn garbage_input_is_a_decode_error_not_a_crash() {
	let service = service();

	assert!(!service.verify("not-a-token"));
	assert!(service.is_expired("not-a-token"));
	assert!(!service.validate_subject("not-a-token", "alice"));
	assert!(service.claims("not-a-token").expect_err("rejected").is_decode_error());
	assert!(service.token_info("not-a-token").expect_err("rejected").is_decode_error());
	assert!(service.refresh("not-a-token", 60).expect_err("rejected").is_decode_error());
}

#[test]
fn refresh_of_hand_crafted_token_without_subject_fails() -> Result<()> {
	let service = service();
	let keys = service.keys();
	let mut claims = ClaimSet::new();

	claims.insert("type".into(), json!("ACCESS"));
	claims.insert("exp".into(), json!(4_000_000_000_i64));

	let token = keys.jws().sign(&claims, &keys.active_signing_key()?)?;

	assert!(service.verify(&token));
	assert!(matches!(service.refresh(&token, 60), Err(Error::MissingField("sub"))));

	let info = service.token_info(&token)?;

	assert_eq!(info.subject, "");
	assert_eq!(info.issued_at.timestamp(), 0);

	Ok(())
}

#[test]
fn published_jwks_verifies_tokens_with_a_standard_decoder() -> Result<()> {
	let service = service();
	let token = service.issue(IssueRequest::new("bob").claim("scope", "read"))?;
	let jwks: JwkSet = service.keys().public_jwks()?;

	assert_eq!(jwks.keys.len(), 1);

	let jwk = jwks.find("k1").expect("k1 published");
	let key = DecodingKey::from_jwk(jwk)?;
	let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);

	validation.set_issuer(&["https://auth.example"]);

	let data = jsonwebtoken::decode::<ClaimSet>(&token, &key, &validation)?;

	assert_eq!(data.claims["scope"], json!("read"));
	assert_eq!(data.header.kid.as_deref(), Some("k1"));

	Ok(())
}
