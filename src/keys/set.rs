//! Immutable key-set snapshot parsed from the key-material document.

// std
use std::{
	collections::{BTreeSet, HashSet},
	fmt::{Debug, Formatter, Result as FmtResult},
};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	jws::{Jws, KeyMaterial},
};

/// Parsed key material; replaced wholesale on every successful reload.
#[derive(Clone)]
pub struct KeySet<K>
where
	K: KeyMaterial,
{
	current_kid: String,
	grace_kids: BTreeSet<String>,
	private_keys: Vec<K>,
	active: usize,
	verification_keys: Vec<K::Public>,
	verification_kids: Vec<String>,
	loaded_at: DateTime<Utc>,
}
impl<K> KeySet<K>
where
	K: KeyMaterial,
{
	/// Assemble a key set, enforcing that `current_kid` names exactly one key.
	///
	/// Grace kids without a matching key are tolerated; they only narrow the verification set.
	pub fn new(
		current_kid: impl Into<String>,
		grace_kids: impl IntoIterator<Item = String>,
		private_keys: Vec<K>,
	) -> Result<Self> {
		let current_kid = current_kid.into();
		let grace_kids: BTreeSet<String> = grace_kids.into_iter().collect();
		let mut seen = HashSet::with_capacity(private_keys.len());

		for key in &private_keys {
			if !seen.insert(key.kid()) {
				return Err(Error::Configuration(format!(
					"Duplicate kid '{}' in key set.",
					key.kid()
				)));
			}
		}

		let active = private_keys.iter().position(|key| key.kid() == current_kid).ok_or_else(|| {
			Error::Configuration(format!("currentKid '{current_kid}' has no matching key."))
		})?;

		for kid in grace_kids.iter().filter(|kid| !seen.contains(kid.as_str())) {
			tracing::warn!(kid = %kid, "grace kid has no matching key; it will not verify tokens");
		}

		let (verification_kids, verification_keys): (Vec<String>, Vec<K::Public>) = private_keys
			.iter()
			.filter(|key| key.kid() == current_kid || grace_kids.contains(key.kid()))
			.map(|key| (key.kid().to_owned(), key.to_public()))
			.unzip();

		Ok(Self {
			current_kid,
			grace_kids,
			private_keys,
			active,
			verification_keys,
			verification_kids,
			loaded_at: Utc::now(),
		})
	}

	/// Parse the `{ currentKid, graceKids, keys }` document.
	pub fn parse<J>(json: &str, jws: &J) -> Result<Self>
	where
		J: Jws<Key = K>,
	{
		let root: Value = serde_json::from_str(json)?;
		let current_kid = root
			.get("currentKid")
			.and_then(Value::as_str)
			.ok_or_else(|| Error::Configuration("Missing currentKid.".into()))?;
		let grace_kids = match root.get("graceKids") {
			None | Some(Value::Null) => Vec::new(),
			Some(Value::Array(items)) => items
				.iter()
				.map(|item| {
					item.as_str().map(ToOwned::to_owned).ok_or_else(|| {
						Error::Configuration("graceKids entries must be strings.".into())
					})
				})
				.collect::<Result<Vec<_>>>()?,
			Some(_) => return Err(Error::Configuration("graceKids must be an array.".into())),
		};
		let entries = root
			.get("keys")
			.and_then(Value::as_array)
			.ok_or_else(|| Error::Configuration("Missing keys.".into()))?;
		let private_keys = entries.iter().map(|entry| jws.parse_key(entry)).collect::<Result<Vec<_>>>()?;

		Self::new(current_kid, grace_kids, private_keys)
	}

	/// Kid currently used for signing.
	pub fn current_kid(&self) -> &str {
		&self.current_kid
	}

	/// Retired kids still accepted for verification.
	pub fn grace_kids(&self) -> &BTreeSet<String> {
		&self.grace_kids
	}

	/// Every key in document order.
	pub fn private_keys(&self) -> &[K] {
		&self.private_keys
	}

	/// Key whose kid equals [`current_kid`](Self::current_kid).
	pub fn active(&self) -> &K {
		&self.private_keys[self.active]
	}

	/// Public halves of the current key and every present grace key.
	pub fn verification_keys(&self) -> &[K::Public] {
		&self.verification_keys
	}

	/// Kids of [`verification_keys`](Self::verification_keys), same order.
	pub fn verification_kids(&self) -> &[String] {
		&self.verification_kids
	}

	/// Whether tokens signed under `kid` are accepted.
	pub fn accepts(&self, kid: &str) -> bool {
		self.verification_kids.iter().any(|accepted| accepted == kid)
	}

	/// Wall-clock time the snapshot was built.
	pub fn loaded_at(&self) -> DateTime<Utc> {
		self.loaded_at
	}
}
impl<K> Debug for KeySet<K>
where
	K: KeyMaterial,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		let kids: Vec<&str> = self.private_keys.iter().map(KeyMaterial::kid).collect();

		f.debug_struct("KeySet")
			.field("current_kid", &self.current_kid)
			.field("grace_kids", &self.grace_kids)
			.field("kids", &kids)
			.field("loaded_at", &self.loaded_at)
			.finish()
	}
}
