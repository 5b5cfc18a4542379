//! Session and access-control core for the Festivo marketplace client—silent
//! OIDC handshakes, live credential renewal, bearer injection, and role-gated
//! navigation in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod nav;
pub mod provider;
pub mod session;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and scripted fixtures for lifecycle tests;
	//! enabled via `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// crates.io
	use tokio::sync::mpsc::UnboundedReceiver;
	// self
	use crate::{
		auth::{Credential, Profile, RoleSet, TokenSecret},
		provider::{Handshake, IdentityProvider, LoginRedirect, ProviderFuture},
		session::{Directive, SessionDriver, SessionHandle},
	};

	/// Identity provider double driven by scripted outcomes.
	///
	/// Each operation pops the next scripted result; exhausted scripts fall
	/// back to an anonymous check, a rejected renewal, and an empty profile.
	/// Call counters let tests assert scheduling behavior.
	#[derive(Default)]
	pub struct ScriptedProvider {
		checks: Mutex<VecDeque<Result<Handshake>>>,
		renewals: Mutex<VecDeque<Result<Credential>>>,
		profiles: Mutex<VecDeque<Result<Profile>>>,
		/// Number of silent checks performed.
		pub check_calls: AtomicUsize,
		/// Number of renewal attempts performed.
		pub renew_calls: AtomicUsize,
		/// Number of profile fetches performed.
		pub profile_calls: AtomicUsize,
	}
	impl ScriptedProvider {
		/// Creates a provider with empty scripts.
		pub fn new() -> Self {
			Self::default()
		}

		/// Queues the next silent-check outcome.
		pub fn script_check(&self, outcome: Result<Handshake>) {
			self.checks.lock().push_back(outcome);
		}

		/// Queues the next renewal outcome.
		pub fn script_renewal(&self, outcome: Result<Credential>) {
			self.renewals.lock().push_back(outcome);
		}

		/// Queues the next profile-fetch outcome.
		pub fn script_profile(&self, outcome: Result<Profile>) {
			self.profiles.lock().push_back(outcome);
		}
	}
	impl IdentityProvider for ScriptedProvider {
		fn check_session(&self) -> ProviderFuture<'_, Handshake> {
			self.check_calls.fetch_add(1, Ordering::SeqCst);

			let outcome = self.checks.lock().pop_front().unwrap_or(Ok(Handshake::Anonymous));

			Box::pin(async move { outcome })
		}

		fn renew(&self) -> ProviderFuture<'_, Credential> {
			self.renew_calls.fetch_add(1, Ordering::SeqCst);

			let outcome = self.renewals.lock().pop_front().unwrap_or_else(|| {
				Err(Error::InvalidGrant { reason: "No scripted renewal outcome remains.".into() })
			});

			Box::pin(async move { outcome })
		}

		fn fetch_profile<'a>(&'a self, _token: &'a TokenSecret) -> ProviderFuture<'a, Profile> {
			self.profile_calls.fetch_add(1, Ordering::SeqCst);

			let outcome = self.profiles.lock().pop_front().unwrap_or(Ok(Profile::default()));

			Box::pin(async move { outcome })
		}

		fn login_url(&self, redirect_uri: &Url, replay: Option<&str>) -> LoginRedirect {
			let mut redirect = redirect_uri.clone();

			if let Some(from) = replay {
				redirect.query_pairs_mut().append_pair("from", from);
			}

			let mut authorize_url = scripted_url("auth");

			authorize_url.query_pairs_mut().append_pair("redirect_uri", redirect.as_str());

			LoginRedirect {
				authorize_url,
				state: "scripted-state".into(),
				code_verifier: TokenSecret::new("scripted-verifier"),
			}
		}

		fn logout_url(&self, redirect_uri: &Url) -> Url {
			let mut url = scripted_url("logout");

			url.query_pairs_mut().append_pair("post_logout_redirect_uri", redirect_uri.as_str());

			url
		}
	}

	/// Builds an active credential fixture with the provided raw roles + TTL.
	pub fn scripted_credential(roles: &[&str], ttl: Duration) -> Credential {
		scripted_credential_with_token("scripted-access", roles, ttl)
	}

	/// Builds an active credential fixture with an explicit token value.
	pub fn scripted_credential_with_token(token: &str, roles: &[&str], ttl: Duration) -> Credential {
		Credential {
			access_token: TokenSecret::new(token),
			expires_at: OffsetDateTime::now_utc() + ttl,
			roles: RoleSet::new(roles.iter().copied()),
			subject: Some("scripted-subject".into()),
		}
	}

	/// Constructs a driver over a fresh store wired to the scripted provider.
	pub fn build_scripted_driver(
		provider: Arc<ScriptedProvider>,
	) -> (SessionDriver, UnboundedReceiver<Directive>) {
		let redirect_uri = Url::parse("https://app.festivo.events/")
			.expect("Test redirect URI should parse successfully.");

		SessionDriver::new(provider, SessionHandle::new(), redirect_uri)
	}

	fn scripted_url(leaf: &str) -> Url {
		Url::parse(&format!(
			"https://id.festivo.test/realms/festivo/protocol/openid-connect/{leaf}"
		))
		.expect("Scripted endpoint URL should parse successfully.")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
