//! Reqwest-backed adapter for a Keycloak-style OpenID-Connect realm.
//!
//! The silent session check and the periodic renewal are both refresh-grant
//! exchanges against the realm's token endpoint; the adapter owns the
//! rotating refresh secret so rotation stays invisible to callers. Login and
//! logout are redirect URLs only - the adapter never performs navigation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{Credential, Profile, TokenClaims, TokenSecret},
	config::RealmConfig,
	error::TransientError,
	provider::{Handshake, IdentityProvider, LoginRedirect, ProviderFuture},
};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Identity provider adapter for one configured Keycloak realm.
pub struct KeycloakProvider {
	config: RealmConfig,
	http: ReqwestClient,
	// Rotates on every refresh-grant exchange that returns a new secret.
	session_grant: Mutex<Option<TokenSecret>>,
}
impl KeycloakProvider {
	/// Creates an adapter with a default HTTP client and no prior session.
	pub fn new(config: RealmConfig) -> Self {
		Self::with_client(config, ReqwestClient::new())
	}

	/// Creates an adapter that reuses the caller-provided HTTP client.
	pub fn with_client(config: RealmConfig, http: ReqwestClient) -> Self {
		Self { config, http, session_grant: Mutex::new(None) }
	}

	/// Seeds the prior-session grant that makes the startup check silent.
	///
	/// The grant comes from whatever storage the provider integration keeps
	/// across page loads; without one, [`IdentityProvider::check_session`]
	/// resolves to an anonymous handshake.
	pub fn with_session_grant(self, grant: impl Into<String>) -> Self {
		*self.session_grant.lock() = Some(TokenSecret::new(grant));

		self
	}

	/// Realm configuration the adapter was built with.
	pub fn realm_config(&self) -> &RealmConfig {
		&self.config
	}

	fn current_grant(&self) -> Option<TokenSecret> {
		self.session_grant.lock().clone()
	}

	async fn exchange_refresh_grant(&self, grant: TokenSecret) -> Result<Credential> {
		let response = self
			.http
			.post(self.config.endpoints.token.clone())
			.form(&[
				("grant_type", "refresh_token"),
				("client_id", self.config.client_id.as_str()),
				("refresh_token", grant.expose()),
			])
			.send()
			.await
			.map_err(Error::from)?;
		let status = response.status().as_u16();
		let bytes = response.bytes().await.map_err(Error::from)?;

		if !(200..300).contains(&status) {
			return Err(map_token_endpoint_error(status, &bytes));
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let payload: TokenEndpointResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| TransientError::TokenResponseParse {
				source,
				status: Some(status),
			})?;

		if let Some(rotated) = payload.refresh_token.as_deref() {
			*self.session_grant.lock() = Some(TokenSecret::new(rotated));
		}

		Ok(build_credential(payload))
	}
}
impl IdentityProvider for KeycloakProvider {
	fn check_session(&self) -> ProviderFuture<'_, Handshake> {
		Box::pin(async move {
			let Some(grant) = self.current_grant() else {
				return Ok(Handshake::Anonymous);
			};

			self.exchange_refresh_grant(grant).await.map(Handshake::Authenticated)
		})
	}

	fn renew(&self) -> ProviderFuture<'_, Credential> {
		Box::pin(async move {
			let grant = self.current_grant().ok_or_else(|| Error::InvalidGrant {
				reason: "No session grant is available for renewal.".into(),
			})?;

			self.exchange_refresh_grant(grant).await
		})
	}

	fn fetch_profile<'a>(&'a self, token: &'a TokenSecret) -> ProviderFuture<'a, Profile> {
		Box::pin(async move {
			let response = self
				.http
				.get(self.config.endpoints.userinfo.clone())
				.bearer_auth(token.expose())
				.send()
				.await
				.map_err(Error::from)?;
			let status = response.status().as_u16();

			if !(200..300).contains(&status) {
				return Err(TransientError::Userinfo {
					message: "Userinfo request was rejected".into(),
					status: Some(status),
				}
				.into());
			}

			let bytes = response.bytes().await.map_err(Error::from)?;

			serde_json::from_slice(&bytes).map_err(|err| {
				TransientError::Userinfo {
					message: format!("Userinfo payload could not be parsed: {err}"),
					status: Some(status),
				}
				.into()
			})
		})
	}

	fn login_url(&self, redirect_uri: &Url, replay: Option<&str>) -> LoginRedirect {
		let state = random_string(STATE_LEN);
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);
		let mut redirect = redirect_uri.clone();

		if let Some(from) = replay {
			redirect.query_pairs_mut().append_pair("from", from);
		}

		let mut authorize_url = self.config.endpoints.authorization.clone();

		{
			let mut pairs = authorize_url.query_pairs_mut();

			pairs.append_pair("response_type", "code");
			pairs.append_pair("client_id", &self.config.client_id);
			pairs.append_pair("redirect_uri", redirect.as_str());
			pairs.append_pair("scope", "openid");
			pairs.append_pair("state", &state);
			pairs.append_pair("code_challenge", &challenge);
			pairs.append_pair("code_challenge_method", "S256");
		}

		LoginRedirect { authorize_url, state, code_verifier: TokenSecret::new(verifier) }
	}

	fn logout_url(&self, redirect_uri: &Url) -> Url {
		let mut url = self.config.endpoints.end_session.clone();

		url.query_pairs_mut()
			.append_pair("post_logout_redirect_uri", redirect_uri.as_str())
			.append_pair("client_id", &self.config.client_id);

		url
	}
}
impl Debug for KeycloakProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeycloakProvider")
			.field("realm", &self.config.realm)
			.field("client_id", &self.config.client_id)
			.field("session_grant_held", &self.session_grant.lock().is_some())
			.finish()
	}
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenEndpointErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

fn build_credential(payload: TokenEndpointResponse) -> Credential {
	let claims = TokenClaims::decode(&payload.access_token).unwrap_or_else(|err| {
		// Opaque or exotic tokens still authenticate; they just carry no
		// roles or subject.
		tracing::debug!(error = %err, "Access token claims were not decodable.");

		TokenClaims::default()
	});
	let now = OffsetDateTime::now_utc();
	let expires_at = match payload.expires_in {
		Some(seconds) if seconds > 0 => now + Duration::seconds(seconds),
		_ => claims.expires_at().unwrap_or(now),
	};
	let roles = claims.roles();
	let subject = claims.sub.clone();

	Credential { access_token: TokenSecret::new(payload.access_token), expires_at, roles, subject }
}

fn map_token_endpoint_error(status: u16, body: &[u8]) -> Error {
	let parsed: TokenEndpointErrorBody = serde_json::from_slice(body).unwrap_or_default();
	let message = parsed
		.error_description
		.or_else(|| parsed.error.clone())
		.unwrap_or_else(|| "Token endpoint returned a non-success status".into());

	if parsed.error.as_deref() == Some("invalid_grant") {
		Error::InvalidGrant { reason: message }
	} else {
		TransientError::TokenEndpoint { message, status: Some(status) }.into()
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;
	use crate::config::RealmConfig;

	fn provider() -> KeycloakProvider {
		let config =
			RealmConfig::from_parts(Some("https://id.festivo.events/realms/festivo"), None);

		KeycloakProvider::new(config)
	}

	fn query_map(url: &Url) -> HashMap<String, String> {
		url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
	}

	#[test]
	fn login_url_carries_pkce_and_state() {
		let adapter = provider();
		let redirect = Url::parse("https://app.festivo.events/")
			.expect("Redirect fixture should parse successfully.");
		let login = adapter.login_url(&redirect, None);
		let params = query_map(&login.authorize_url);

		assert!(login.authorize_url.as_str().starts_with(
			"https://id.festivo.events/realms/festivo/protocol/openid-connect/auth?",
		));
		assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(params.get("client_id").map(String::as_str), Some("festivo-web"));
		assert_eq!(params.get("scope").map(String::as_str), Some("openid"));
		assert_eq!(params.get("code_challenge_method").map(String::as_str), Some("S256"));
		assert_eq!(params.get("state"), Some(&login.state));
		assert_eq!(login.state.len(), STATE_LEN);
		assert_eq!(
			params.get("code_challenge").map(String::as_str),
			Some(compute_pkce_challenge(login.code_verifier.expose()).as_str()),
		);
	}

	#[test]
	fn login_url_appends_replay_location_to_redirect() {
		let adapter = provider();
		let redirect = Url::parse("https://app.festivo.events/")
			.expect("Redirect fixture should parse successfully.");
		let login = adapter.login_url(&redirect, Some("/admin/users"));
		let params = query_map(&login.authorize_url);
		let embedded = Url::parse(params.get("redirect_uri").expect("Redirect URI should be set."))
			.expect("Embedded redirect URI should parse.");

		assert_eq!(
			query_map(&embedded).get("from").map(String::as_str),
			Some("/admin/users"),
		);
	}

	#[test]
	fn logout_url_returns_browser_to_origin() {
		let adapter = provider();
		let redirect = Url::parse("https://app.festivo.events/")
			.expect("Redirect fixture should parse successfully.");
		let url = adapter.logout_url(&redirect);
		let params = query_map(&url);

		assert!(url.path().ends_with("/protocol/openid-connect/logout"));
		assert_eq!(
			params.get("post_logout_redirect_uri").map(String::as_str),
			Some("https://app.festivo.events/"),
		);
		assert_eq!(params.get("client_id").map(String::as_str), Some("festivo-web"));
	}

	#[test]
	fn invalid_grant_body_maps_to_invalid_grant_error() {
		let body = b"{\"error\":\"invalid_grant\",\"error_description\":\"Session not active\"}";
		let err = map_token_endpoint_error(400, body);

		assert!(matches!(err, Error::InvalidGrant { ref reason } if reason == "Session not active"));

		let other = map_token_endpoint_error(502, b"upstream exploded");

		assert!(matches!(other, Error::Transient(TransientError::TokenEndpoint { .. })));
	}

	#[test]
	fn credential_prefers_expires_in_over_claims() {
		let payload = TokenEndpointResponse {
			access_token: "opaque".into(),
			refresh_token: None,
			expires_in: Some(300),
		};
		let before = OffsetDateTime::now_utc();
		let credential = build_credential(payload);

		assert!(credential.expires_at >= before + Duration::seconds(299));
		assert!(credential.roles.is_empty());
		assert!(credential.subject.is_none());
	}
}
