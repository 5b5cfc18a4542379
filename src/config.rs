//! Environment configuration and realm/endpoint resolution.
//!
//! The client receives one combined OIDC URL plus a client identifier and an
//! API base URL. [`RealmConfig::derive`] recovers the provider base URL and
//! realm from the combined URL by splitting on the `/realms/` path marker.
//! Derivation is infallible: absent or malformed configuration degrades to the
//! documented fallback triple instead of failing startup.

// std
use std::env;
// self
use crate::_prelude::*;

/// Fallback provider base URL used when configuration is absent or malformed.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";
/// Fallback realm name.
pub const DEFAULT_REALM: &str = "festivo";
/// Fallback OAuth client identifier.
pub const DEFAULT_CLIENT_ID: &str = "festivo-web";
/// Fallback REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

const REALM_MARKER: &str = "/realms/";

/// Raw application configuration resolved from the process environment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
	/// Base URL for the marketplace REST API.
	pub api_base_url: Option<String>,
	/// Combined OIDC URL (`<provider base>/realms/<realm>`), if configured.
	pub oidc_url: Option<String>,
	/// OAuth client identifier, if configured.
	pub client_id: Option<String>,
}
impl AppConfig {
	/// Reads `FESTIVO_API_BASE_URL`, `FESTIVO_OIDC_URL`, and `FESTIVO_CLIENT_ID`.
	///
	/// Unset or empty variables are treated as absent.
	pub fn from_env() -> Self {
		Self {
			api_base_url: non_empty_var("FESTIVO_API_BASE_URL"),
			oidc_url: non_empty_var("FESTIVO_OIDC_URL"),
			client_id: non_empty_var("FESTIVO_CLIENT_ID"),
		}
	}

	/// Returns the configured API base URL or the documented fallback.
	pub fn api_base_url(&self) -> &str {
		self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
	}
}

/// Resolved provider realm configuration with pre-built endpoint URLs.
///
/// Constructed once per process via [`RealmConfig::derive`]; every URL the
/// adapter touches is validated here so the provider layer never parses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealmConfig {
	/// Provider base URL (scheme + authority + optional context path).
	pub base_url: Url,
	/// Realm the client authenticates against.
	pub realm: String,
	/// OAuth client identifier presented in every provider interaction.
	pub client_id: String,
	/// OpenID-Connect endpoints under `<base>/realms/<realm>`.
	pub endpoints: RealmEndpoints,
}
impl RealmConfig {
	/// Derives the realm configuration from resolved application config.
	pub fn derive(config: &AppConfig) -> Self {
		Self::from_parts(config.oidc_url.as_deref(), config.client_id.as_deref())
	}

	/// Derives the realm configuration from a combined OIDC URL and client id.
	///
	/// Never fails: any parsing problem yields the fallback triple.
	pub fn from_parts(oidc_url: Option<&str>, client_id: Option<&str>) -> Self {
		let client_id =
			client_id.filter(|value| !value.is_empty()).unwrap_or(DEFAULT_CLIENT_ID).to_owned();
		let Some(raw) = oidc_url.filter(|value| !value.is_empty()) else {
			return Self::fallback(client_id);
		};

		if let Some(config) = split_on_marker(raw, &client_id) {
			return config;
		}
		if let Some(config) = walk_path_segments(raw, &client_id) {
			return config;
		}

		Self::fallback(client_id)
	}

	fn fallback(client_id: String) -> Self {
		let base_url =
			Url::parse(DEFAULT_BASE_URL).expect("Fallback provider base URL is a valid constant.");
		let endpoints = RealmEndpoints::build(&base_url, DEFAULT_REALM)
			.expect("Fallback endpoints derive from valid constants.");

		Self { base_url, realm: DEFAULT_REALM.to_owned(), client_id, endpoints }
	}

	fn assemble(base_url: Url, realm: &str, client_id: &str) -> Option<Self> {
		if !valid_realm(realm) {
			return None;
		}

		let endpoints = RealmEndpoints::build(&base_url, realm)?;

		Some(Self { base_url, realm: realm.to_owned(), client_id: client_id.to_owned(), endpoints })
	}
}

/// OpenID-Connect endpoint URLs for a resolved realm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealmEndpoints {
	/// Interactive authorization endpoint (`auth`).
	pub authorization: Url,
	/// Token endpoint (`token`) used for silent checks and renewals.
	pub token: Url,
	/// End-session endpoint (`logout`).
	pub end_session: Url,
	/// Userinfo endpoint (`userinfo`) for profile retrieval.
	pub userinfo: Url,
}
impl RealmEndpoints {
	fn build(base_url: &Url, realm: &str) -> Option<Self> {
		let root = format!(
			"{}/realms/{}/protocol/openid-connect",
			base_url.as_str().trim_end_matches('/'),
			realm
		);

		Some(Self {
			authorization: Url::parse(&format!("{root}/auth")).ok()?,
			token: Url::parse(&format!("{root}/token")).ok()?,
			end_session: Url::parse(&format!("{root}/logout")).ok()?,
			userinfo: Url::parse(&format!("{root}/userinfo")).ok()?,
		})
	}
}

fn non_empty_var(key: &str) -> Option<String> {
	env::var(key).ok().filter(|value| !value.is_empty())
}

fn valid_realm(realm: &str) -> bool {
	!realm.is_empty() && !realm.contains('/') && !realm.chars().any(char::is_whitespace)
}

fn split_on_marker(raw: &str, client_id: &str) -> Option<RealmConfig> {
	let (base, rest) = raw.split_once(REALM_MARKER)?;

	if base.is_empty() || rest.is_empty() {
		return None;
	}

	let realm = rest.split('/').next().filter(|segment| !segment.is_empty())?;
	let base_url = Url::parse(base).ok()?;

	RealmConfig::assemble(base_url, realm, client_id)
}

fn walk_path_segments(raw: &str, client_id: &str) -> Option<RealmConfig> {
	let url = Url::parse(raw).ok()?;
	let segments: Vec<&str> = match url.path_segments() {
		Some(segments) => segments.filter(|segment| !segment.is_empty()).collect(),
		None => Vec::new(),
	};
	let origin = url.origin().ascii_serialization();
	let Some(realm_index) = segments.iter().position(|segment| *segment == "realms") else {
		// Parseable URL without the realm marker: keep the origin, assume the
		// default realm.
		return RealmConfig::assemble(Url::parse(&origin).ok()?, DEFAULT_REALM, client_id);
	};
	let realm = *segments.get(realm_index + 1)?;
	let base = if realm_index == 0 {
		origin
	} else {
		format!("{origin}/{}", segments[..realm_index].join("/"))
	};
	let base_url = Url::parse(&base).ok()?;

	RealmConfig::assemble(base_url, realm, client_id)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn derives_realm_from_marker_split() {
		let config =
			RealmConfig::from_parts(Some("https://id.festivo.events/realms/festivo"), None);

		assert_eq!(config.base_url.as_str(), "https://id.festivo.events/");
		assert_eq!(config.realm, "festivo");
		assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
		assert_eq!(
			config.endpoints.token.as_str(),
			"https://id.festivo.events/realms/festivo/protocol/openid-connect/token",
		);
	}

	#[test]
	fn derives_realm_behind_context_path() {
		let config = RealmConfig::from_parts(
			Some("https://sso.festivo.events/auth/realms/prod/protocol/openid-connect/auth"),
			Some("festivo-admin"),
		);

		assert_eq!(config.realm, "prod");
		assert_eq!(config.client_id, "festivo-admin");
		assert!(config.base_url.as_str().starts_with("https://sso.festivo.events/auth"));
	}

	#[test]
	fn malformed_url_degrades_to_fallback_triple() {
		let config = RealmConfig::from_parts(Some("not a url at all"), None);

		assert_eq!(config.base_url.as_str(), format!("{DEFAULT_BASE_URL}/"));
		assert_eq!(config.realm, DEFAULT_REALM);
		assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
	}

	#[test]
	fn absent_configuration_degrades_to_fallback_triple() {
		let config = RealmConfig::from_parts(None, None);

		assert_eq!(config.realm, DEFAULT_REALM);
		assert_eq!(config.client_id, DEFAULT_CLIENT_ID);

		let empty = RealmConfig::from_parts(Some(""), Some(""));

		assert_eq!(empty.realm, DEFAULT_REALM);
		assert_eq!(empty.client_id, DEFAULT_CLIENT_ID);
	}

	#[test]
	fn url_without_realm_marker_keeps_origin_and_default_realm() {
		let config = RealmConfig::from_parts(Some("https://id.festivo.events/other/path"), None);

		assert_eq!(config.base_url.as_str(), "https://id.festivo.events/");
		assert_eq!(config.realm, DEFAULT_REALM);
	}

	#[test]
	fn env_resolution_handles_missing_variables() {
		let config = AppConfig::default();

		assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
		assert!(config.oidc_url.is_none());
	}
}
