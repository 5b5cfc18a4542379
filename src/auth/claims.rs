//! Payload-segment decoding for provider-issued JWT access tokens.
//!
//! The client trusts the token it was handed by the provider and only needs a
//! handful of claims (`sub`, `exp`, `realm_access.roles`), so this is a
//! payload-only base64url decode + parse with no signature verification.
//! Decode failures are never fatal to the session: a token whose claims
//! cannot be read simply yields an empty role set and no subject.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::role::RoleSet};

/// Errors emitted while decoding token claims.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// Token is not a three-segment JWT.
	#[error("Access token is not a JWT.")]
	MalformedToken,
	/// Payload segment is not valid base64url.
	#[error("Access token payload is not valid base64url.")]
	Payload(#[from] base64::DecodeError),
	/// Payload JSON could not be parsed into the expected claim shape.
	#[error("Access token claims could not be parsed.")]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
}

/// Subset of access-token claims the session core consumes.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenClaims {
	/// Stable provider subject identifier.
	pub sub: Option<String>,
	/// Expiry as seconds since the Unix epoch.
	pub exp: Option<i64>,
	/// Preferred username, when the provider includes it in the access token.
	pub preferred_username: Option<String>,
	/// Email, when the provider includes it in the access token.
	pub email: Option<String>,
	#[serde(default)]
	realm_access: Option<RealmAccess>,
}
impl TokenClaims {
	/// Decodes the payload segment of a JWT access token.
	pub fn decode(token: &str) -> Result<Self, ClaimsError> {
		let mut segments = token.split('.');
		let payload = match (segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_)) => payload,
			_ => return Err(ClaimsError::MalformedToken),
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload)?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let claims = serde_path_to_error::deserialize(&mut deserializer)?;

		Ok(claims)
	}

	/// Normalized realm roles carried by the token; empty when absent.
	pub fn roles(&self) -> RoleSet {
		self.realm_access
			.as_ref()
			.map(|access| RoleSet::new(&access.roles))
			.unwrap_or_default()
	}

	/// Expiry instant, when the token carries a parseable `exp` claim.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RealmAccess {
	#[serde(default)]
	roles: Vec<String>,
}
