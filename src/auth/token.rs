//! Bearer credential models with redaction and freshness helpers.

// self
use crate::{_prelude::*, auth::role::RoleSet};

/// Redacted secret wrapper keeping bearer material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// A live access credential produced by a provider handshake or renewal.
///
/// Roles and subject are decoded from the access token itself; `expires_at`
/// drives the background renewal schedule.
#[derive(Clone)]
pub struct Credential {
	/// Bearer access token; injected into outbound API requests.
	pub access_token: TokenSecret,
	/// Expiry instant for the access token.
	pub expires_at: OffsetDateTime,
	/// Normalized roles decoded from the token.
	pub roles: RoleSet,
	/// Provider subject identifier, for correlation/logging only.
	pub subject: Option<String>,
}
impl Credential {
	/// Returns true when the credential is inside `window` of its expiry at
	/// `now` (including already past it) and should be renewed.
	pub fn expires_within(&self, now: OffsetDateTime, window: Duration) -> bool {
		self.expires_at - now <= window
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &self.access_token)
			.field("expires_at", &self.expires_at)
			.field("roles", &self.roles)
			.field("subject", &self.subject)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "super-secret");
	}

	#[test]
	fn freshness_window_covers_near_and_past_expiry() {
		let credential = Credential {
			access_token: TokenSecret::new("access"),
			expires_at: macros::datetime!(2025-01-01 00:05 UTC),
			roles: RoleSet::default(),
			subject: None,
		};
		let window = Duration::seconds(60);

		assert!(!credential.expires_within(macros::datetime!(2025-01-01 00:00 UTC), window));
		assert!(credential.expires_within(macros::datetime!(2025-01-01 00:04:30 UTC), window));
		assert!(credential.expires_within(macros::datetime!(2025-01-01 00:06 UTC), window));
	}
}
