// std
use std::{sync::Arc, time::Duration as StdDuration};

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use festivo_session::{
	config::RealmConfig,
	provider::KeycloakProvider,
	session::{Directive, SessionDriver, SessionHandle},
};

const TOKEN_PATH: &str = "/realms/festivo/protocol/openid-connect/token";
const USERINFO_PATH: &str = "/realms/festivo/protocol/openid-connect/userinfo";
const AUTH_PATH: &str = "/realms/festivo/protocol/openid-connect/auth";

fn signed_token(sub: &str, roles: &[&str], ttl: Duration) -> String {
	let exp = (OffsetDateTime::now_utc() + ttl).unix_timestamp();
	let payload = serde_json::json!({
		"sub": sub,
		"exp": exp,
		"realm_access": { "roles": roles },
	});

	format!(
		"{}.{}.{}",
		URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
		URL_SAFE_NO_PAD.encode(payload.to_string()),
		URL_SAFE_NO_PAD.encode("signature"),
	)
}

fn build_driver(
	server: &MockServer,
	grant: Option<&str>,
) -> (SessionDriver, tokio::sync::mpsc::UnboundedReceiver<Directive>) {
	let config = RealmConfig::from_parts(Some(&server.url("/realms/festivo")), None);
	let mut provider = KeycloakProvider::new(config);

	if let Some(grant) = grant {
		provider = provider.with_session_grant(grant);
	}

	let redirect_uri = Url::parse("https://app.festivo.events/")
		.expect("Redirect fixture should parse successfully.");
	let (driver, directives) = SessionDriver::new(Arc::new(provider), SessionHandle::new(), redirect_uri);

	(driver.with_renewal_interval(StdDuration::from_millis(10)), directives)
}

#[tokio::test]
async fn anonymous_startup_initializes_without_touching_endpoints() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200);
		})
		.await;
	let (driver, _directives) = build_driver(&server, None);
	let state = driver.initialize().await;

	assert!(state.initialized);
	assert!(!state.authenticated);

	token_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn startup_handshake_authenticates_and_loads_the_profile() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").json_body(
				serde_json::json!({
					"access_token": signed_token("subject-1", &["vendor"], Duration::minutes(10)),
					"refresh_token": "rotated-grant",
					"expires_in": 600,
				}),
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.json_body(serde_json::json!({ "preferred_username": "ada" }));
		})
		.await;

	let (driver, _directives) = build_driver(&server, Some("seed-grant"));
	let state = driver.initialize().await;

	assert!(state.authenticated);
	assert!(state.has_role(["ROLE_VENDOR"]));
	assert_eq!(state.subject.as_deref(), Some("subject-1"));

	// The userinfo fetch is fire-and-forget; the profile arrives via the
	// watch channel shortly after the handshake snapshot.
	let mut receiver = driver.handle().subscribe();

	tokio::time::timeout(StdDuration::from_secs(1), async {
		loop {
			if receiver.borrow_and_update().profile.is_some() {
				break;
			}

			receiver.changed().await.expect("Session publisher should stay alive.");
		}
	})
	.await
	.expect("Profile should arrive shortly after authentication.");

	assert_eq!(
		driver.handle().snapshot().profile.and_then(|profile| profile.username),
		Some("ada".into()),
	);
}

#[tokio::test]
async fn near_expiry_token_is_renewed_in_the_background() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			// Always inside the freshness window, so every tick renews.
			then.status(200).header("content-type", "application/json").json_body(
				serde_json::json!({
					"access_token": signed_token("subject-1", &["organizer"], Duration::seconds(30)),
					"refresh_token": "rotated-grant",
					"expires_in": 30,
				}),
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.json_body(serde_json::json!({}));
		})
		.await;

	let (driver, _directives) = build_driver(&server, Some("seed-grant"));

	driver.initialize().await;
	tokio::time::sleep(StdDuration::from_millis(150)).await;

	// At least the startup exchange plus one background renewal.
	assert!(token_mock.calls_async().await >= 2);
	assert!(driver.handle().snapshot().authenticated);
}

#[tokio::test]
async fn revoked_session_resets_state_and_escalates_to_login_once() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("refresh_token=seed-grant");
			then.status(200).header("content-type", "application/json").json_body(
				serde_json::json!({
					"access_token": signed_token("subject-1", &["organizer"], Duration::seconds(30)),
					"refresh_token": "rotated-grant",
					"expires_in": 30,
				}),
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("refresh_token=rotated-grant");
			then.status(400).header("content-type", "application/json").json_body(
				serde_json::json!({
					"error": "invalid_grant",
					"error_description": "Session not active",
				}),
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.json_body(serde_json::json!({}));
		})
		.await;

	let (driver, mut directives) = build_driver(&server, Some("seed-grant"));

	driver.initialize().await;
	// Many renewal ticks pass; the escalation must still fire exactly once.
	tokio::time::sleep(StdDuration::from_millis(200)).await;

	let state = driver.handle().snapshot();

	assert!(state.initialized);
	assert!(!state.authenticated);
	assert!(state.token.is_none());
	assert!(state.roles.is_empty());

	let directive = directives.try_recv().expect("One login directive should be queued.");
	let Directive::RedirectLogin(redirect) = directive else {
		panic!("Renewal failure should escalate to an interactive login.");
	};

	assert!(redirect.authorize_url.as_str().starts_with(&server.url(AUTH_PATH)));
	assert!(!redirect.state.is_empty());
	assert!(directives.try_recv().is_err(), "Escalation must not repeat per tick.");
}
