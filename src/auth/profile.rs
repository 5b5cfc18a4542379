//! Display profile fetched from the provider's userinfo endpoint.

// self
use crate::_prelude::*;

/// Display attributes for the signed-in user.
///
/// Fetched once after authentication, asynchronously: consumers must treat it
/// as eventually consistent with the authenticated flag, never atomic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
	/// Preferred username shown in the navigation shell.
	#[serde(default, rename = "preferred_username")]
	pub username: Option<String>,
	/// Contact email.
	#[serde(default)]
	pub email: Option<String>,
	/// Given name.
	#[serde(default, rename = "given_name")]
	pub first_name: Option<String>,
	/// Family name.
	#[serde(default, rename = "family_name")]
	pub last_name: Option<String>,
	/// Any custom attributes the realm exposes through userinfo.
	#[serde(flatten)]
	pub attributes: HashMap<String, serde_json::Value>,
}
impl Profile {
	/// Best-effort human-readable name: full name, else username, else email.
	pub fn display_name(&self) -> Option<String> {
		match (&self.first_name, &self.last_name) {
			(Some(first), Some(last)) => Some(format!("{first} {last}")),
			(Some(first), None) => Some(first.clone()),
			(None, Some(last)) => Some(last.clone()),
			(None, None) => self.username.clone().or_else(|| self.email.clone()),
		}
	}
}
