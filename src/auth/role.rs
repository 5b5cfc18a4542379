//! Authorization role modeling and normalization.
//!
//! Raw role strings handed out by the identity provider (`admin`, `vendor`)
//! are normalized to the platform convention (`ROLE_ADMIN`, `ROLE_VENDOR`)
//! before they are stored. Every comparison in the crate is exact string
//! equality over the normalized form; there is no prefix or case-insensitive
//! matching anywhere.

// std
use std::{cmp::Ordering, collections::BTreeSet, slice::Iter};
// crates.io
use serde::{Deserializer, Serializer, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// Prefix applied to every normalized role.
pub const ROLE_PREFIX: &str = "ROLE_";

/// A single normalized authorization role.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Role(String);
impl Role {
	/// Normalizes a raw provider role: upper-cased and `ROLE_`-prefixed.
	///
	/// Normalization is idempotent so already-normalized candidates (the form
	/// route declarations are written in) pass through unchanged.
	pub fn normalize(raw: impl AsRef<str>) -> Self {
		let upper = raw.as_ref().to_uppercase();

		if upper.starts_with(ROLE_PREFIX) {
			Self(upper)
		} else {
			Self(format!("{ROLE_PREFIX}{upper}"))
		}
	}
}
impl AsRef<str> for Role {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<String> for Role {
	fn from(value: String) -> Self {
		Self::normalize(value)
	}
}
impl From<Role> for String {
	fn from(value: Role) -> Self {
		value.0
	}
}
impl Debug for Role {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Role({})", self.0)
	}
}
impl Display for Role {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Normalized, deduplicated, sorted set of authorization roles.
///
/// Empty raw entries are dropped rather than rejected: role derivation is on
/// the startup path and must never fail.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RoleSet(Arc<[Role]>);
impl RoleSet {
	/// Builds a normalized role set from any iterator of raw or normalized roles.
	pub fn new<I, S>(roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let set: BTreeSet<Role> = roles
			.into_iter()
			.filter(|role| !role.as_ref().is_empty())
			.map(Role::normalize)
			.collect();

		Self(Arc::from(set.into_iter().collect::<Vec<_>>()))
	}

	/// Number of distinct roles.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no roles are held.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Exact-equality membership test over the normalized form.
	pub fn contains(&self, role: &Role) -> bool {
		self.0.binary_search(role).is_ok()
	}

	/// Returns true iff any candidate is held (logical OR across candidates).
	pub fn intersects(&self, candidates: &RoleSet) -> bool {
		candidates.iter().any(|candidate| self.contains(candidate))
	}

	/// Iterator over the normalized roles.
	pub fn iter(&self) -> Iter<'_, Role> {
		self.0.iter()
	}
}
impl Debug for RoleSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("RoleSet").field(&self.0).finish()
	}
}
impl Display for RoleSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut first = true;

		for role in self.iter() {
			if !first {
				f.write_str(" ")?;
			}

			Display::fmt(role, f)?;

			first = false;
		}

		Ok(())
	}
}
impl PartialOrd for RoleSet {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for RoleSet {
	fn cmp(&self, other: &Self) -> Ordering {
		self.0.cmp(&other.0)
	}
}
impl<'a> IntoIterator for &'a RoleSet {
	type IntoIter = Iter<'a, Role>;
	type Item = &'a Role;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
impl<S> FromIterator<S> for RoleSet
where
	S: AsRef<str>,
{
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self::new(iter)
	}
}
impl Serialize for RoleSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.0.len()))?;

		for role in self.iter() {
			seq.serialize_element(role.as_ref())?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for RoleSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		Ok(Self::new(values))
	}
}
