//! Identity provider contract and the built-in Keycloak adapter.
//!
//! The [`IdentityProvider`] trait is the crate's only seam to the external
//! OpenID-Connect world: a silent session check at startup, refresh-grant
//! renewal, userinfo retrieval, and construction of the interactive
//! login/logout redirect URLs. Redirects are terminal transitions; the core
//! never observes its own post-redirect outcome in the same process.

pub mod keycloak;

pub use keycloak::KeycloakProvider;

// self
use crate::{
	_prelude::*,
	auth::{Credential, Profile, TokenSecret},
};

/// Boxed future returned by [`IdentityProvider`] operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Outcome of the non-interactive session check performed at startup.
#[derive(Clone, Debug)]
pub enum Handshake {
	/// The provider still holds a session; a live credential was issued.
	Authenticated(Credential),
	/// No provider session exists; the user stays logged out.
	Anonymous,
}

/// Interactive login redirect produced by [`IdentityProvider::login_url`].
///
/// The host shell navigates to `authorize_url` and must stash `state` and
/// `code_verifier` so the post-redirect page load can finish the code
/// exchange. Control does not return to the issuing process.
#[derive(Clone)]
pub struct LoginRedirect {
	/// Fully-formed authorization-code + PKCE authorize URL.
	pub authorize_url: Url,
	/// Opaque state value that must round-trip via the redirect.
	pub state: String,
	/// PKCE code verifier matching the challenge embedded in the URL.
	pub code_verifier: TokenSecret,
}
impl Debug for LoginRedirect {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRedirect")
			.field("authorize_url", &self.authorize_url)
			.field("state", &self.state)
			.field("code_verifier", &self.code_verifier)
			.finish()
	}
}

/// Contract for the one conversation with the external identity provider.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Non-interactive session check. Resolves to [`Handshake::Anonymous`]
	/// when no session exists; transport errors propagate and are mapped to
	/// an anonymous outcome by the lifecycle layer. Called once per process.
	fn check_session(&self) -> ProviderFuture<'_, Handshake>;

	/// Renews the access credential via the refresh grant. Errors propagate;
	/// the lifecycle layer escalates them to an interactive login.
	fn renew(&self) -> ProviderFuture<'_, Credential>;

	/// Fetches the userinfo profile with the provided bearer token.
	fn fetch_profile<'a>(&'a self, token: &'a TokenSecret) -> ProviderFuture<'a, Profile>;

	/// Builds the interactive login redirect. `replay` is the originally
	/// requested location, appended to the redirect URI so the post-login
	/// page load can restore it.
	fn login_url(&self, redirect_uri: &Url, replay: Option<&str>) -> LoginRedirect;

	/// Builds the interactive logout redirect, returning the browser to
	/// `redirect_uri` afterwards.
	fn logout_url(&self, redirect_uri: &Url) -> Url;
}
