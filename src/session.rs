//! Process-wide session state with single-writer, multi-reader discipline.
//!
//! [`SessionHandle`] is the only mutable shared state in the crate. It is
//! constructed explicitly by the application's composition root (no hidden
//! global) and mutated exclusively through [`SessionEvent`] dispatch from the
//! lifecycle driver; every other component reads atomic snapshots or
//! subscribes to the watch channel and re-decides on change.

pub mod lifecycle;

pub use lifecycle::{Directive, SessionDriver};

// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	auth::{Profile, RoleSet, TokenSecret},
	provider::Handshake,
};

/// The session state consumed by navigation, pages, and the API client.
///
/// `snapshot` clones are handed to observers wholesale so no reader ever sees
/// a partially-applied update.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
	/// True once the first silent-check attempt has resolved either way.
	/// Consumers must not branch on `authenticated` before this is true.
	pub initialized: bool,
	/// True iff a currently-valid access token is held.
	pub authenticated: bool,
	/// Current bearer credential; present iff `authenticated`.
	pub token: Option<TokenSecret>,
	/// Normalized authorization roles; empty when unauthenticated.
	pub roles: RoleSet,
	/// Display attributes; arrives asynchronously after authentication.
	pub profile: Option<Profile>,
	/// Provider subject identifier, for correlation/logging only - never an
	/// authorization input.
	pub subject: Option<String>,
}
impl SessionState {
	/// Returns true iff any candidate role is held (logical OR).
	pub fn has_role<I, S>(&self, candidates: I) -> bool
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.roles.intersects(&RoleSet::new(candidates))
	}
}

/// Mutation messages dispatched into the session store.
///
/// Only the lifecycle driver constructs these; the single entry point keeps
/// the store single-writer without overwritable callback fields.
#[derive(Clone, Debug)]
pub enum SessionEvent {
	/// The startup silent check resolved.
	HandshakeCompleted(Handshake),
	/// The fire-and-forget userinfo fetch resolved.
	ProfileLoaded(Profile),
	/// Background renewal succeeded; updates the token field only.
	TokenRenewed(TokenSecret),
	/// Renewal failed or the provider reported a logout; full reset back to
	/// the unauthenticated default (roles, profile, and subject cleared).
	SessionExpired,
}

/// Cloneable handle over the one session store of a page session.
#[derive(Clone, Debug)]
pub struct SessionHandle(Arc<SessionInner>);
impl SessionHandle {
	/// Creates a fresh, uninitialized session store.
	pub fn new() -> Self {
		let (publisher, _) = watch::channel(SessionState::default());

		Self(Arc::new(SessionInner { state: RwLock::new(SessionState::default()), publisher }))
	}

	/// Returns an atomic snapshot of the current state.
	pub fn snapshot(&self) -> SessionState {
		self.0.state.read().clone()
	}

	/// Subscribes to state changes; each received value is a full snapshot.
	pub fn subscribe(&self) -> watch::Receiver<SessionState> {
		self.0.publisher.subscribe()
	}

	/// Returns true iff any candidate role is held by the current state.
	pub fn has_role<I, S>(&self, candidates: I) -> bool
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.snapshot().has_role(candidates)
	}

	/// Returns a supplier that always reflects the current token.
	///
	/// This is the credential-injection integration point: the supplier is
	/// registered once and re-resolved per request, so a mid-session renewal
	/// is visible on the very next outbound call.
	pub fn token_supplier(&self) -> impl Fn() -> Option<TokenSecret> + Send + Sync + use<> {
		let handle = self.clone();

		move || handle.0.state.read().token.clone()
	}

	pub(crate) fn apply(&self, event: SessionEvent) {
		let next = {
			let mut state = self.0.state.write();

			reduce(&mut state, event);

			state.clone()
		};

		// Publish outside the lock; receivers see whole snapshots only.
		let _ = self.0.publisher.send(next);
	}
}
impl Default for SessionHandle {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Debug)]
struct SessionInner {
	state: RwLock<SessionState>,
	publisher: watch::Sender<SessionState>,
}

fn reduce(state: &mut SessionState, event: SessionEvent) {
	match event {
		SessionEvent::HandshakeCompleted(Handshake::Authenticated(credential)) => {
			state.initialized = true;
			state.authenticated = true;
			state.token = Some(credential.access_token);
			state.roles = credential.roles;
			state.subject = credential.subject;
			state.profile = None;
		},
		SessionEvent::HandshakeCompleted(Handshake::Anonymous) => {
			*state = SessionState { initialized: true, ..SessionState::default() };
		},
		SessionEvent::ProfileLoaded(profile) =>
			if state.authenticated {
				state.profile = Some(profile);
			},
		SessionEvent::TokenRenewed(token) =>
			if state.authenticated {
				state.token = Some(token);
			},
		SessionEvent::SessionExpired => {
			*state = SessionState { initialized: true, ..SessionState::default() };
		},
	}
}
