//! Integration tests for the token lifecycle over real RSA key material.

mod key_rotation;
mod token_lifecycle;

// crates.io
use serde_json::{Value, json};

const FIXTURES: &str = include_str!("../fixtures/keys.json");

/// Key-set document built from the fixture RSA keys.
fn document(current: &str, grace: &[&str], kids: &[&str]) -> String {
	let fixtures: Value = serde_json::from_str(FIXTURES).expect("fixture json");
	let keys: Vec<Value> = kids.iter().map(|kid| fixtures[*kid].clone()).collect();

	json!({ "currentKid": current, "graceKids": grace, "keys": keys }).to_string()
}

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
