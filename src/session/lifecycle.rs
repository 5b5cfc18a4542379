//! Session lifecycle orchestration: startup handshake, background renewal,
//! and interactive redirect directives.
//!
//! [`SessionDriver`] is the session store's single writer. It runs the silent
//! check exactly once, spawns the fire-and-forget profile fetch, and keeps a
//! renewal scheduler ticking every [`RENEWAL_INTERVAL`]; a token inside
//! [`FRESHNESS_WINDOW`] of expiry is renewed proactively. Renewal failure is
//! treated as locally unrecoverable: the state is fully reset and a single
//! login redirect directive is emitted - a booking or payment call must never
//! ride on a stale credential.

// std
use std::{
	sync::atomic::{AtomicBool, Ordering},
	time::Duration as StdDuration,
};
// crates.io
use tokio::{
	sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
	task::JoinHandle,
	time::MissedTickBehavior,
};
use tracing::{debug, warn};
// self
use crate::{
	_prelude::*,
	provider::{Handshake, IdentityProvider, LoginRedirect},
	session::{SessionEvent, SessionHandle, SessionState},
};

/// Cadence of the background renewal scheduler.
pub const RENEWAL_INTERVAL: StdDuration = StdDuration::from_secs(30);
/// Time-before-expiry threshold that triggers proactive renewal.
pub const FRESHNESS_WINDOW: Duration = Duration::seconds(60);

/// Navigation side effects the host shell must perform.
///
/// Redirects are terminal: once the host navigates, this process does not
/// observe the outcome - the next page load starts a fresh handshake.
#[derive(Debug)]
pub enum Directive {
	/// Navigate to the provider's interactive login page.
	RedirectLogin(Box<LoginRedirect>),
	/// Navigate to the provider's end-session page.
	RedirectLogout(Url),
}

/// Owns the provider conversation and drives the session store.
pub struct SessionDriver {
	provider: Arc<dyn IdentityProvider>,
	handle: SessionHandle,
	directives: UnboundedSender<Directive>,
	redirect_uri: Url,
	renewal_interval: StdDuration,
	started: AtomicBool,
	shared: Arc<DriverShared>,
	renewal_task: Mutex<Option<JoinHandle<()>>>,
}
impl SessionDriver {
	/// Creates a driver plus the receiving end of its directive channel.
	///
	/// `redirect_uri` is the application origin interactive flows return to.
	pub fn new(
		provider: Arc<dyn IdentityProvider>,
		handle: SessionHandle,
		redirect_uri: Url,
	) -> (Self, UnboundedReceiver<Directive>) {
		let (directives, receiver) = mpsc::unbounded_channel();
		let driver = Self {
			provider,
			handle,
			directives,
			redirect_uri,
			renewal_interval: RENEWAL_INTERVAL,
			started: AtomicBool::new(false),
			shared: Arc::new(DriverShared {
				expiry: Mutex::new(None),
				login_latch: AtomicBool::new(false),
				renewal_guard: AsyncMutex::new(()),
			}),
			renewal_task: Mutex::new(None),
		};

		(driver, receiver)
	}

	/// Overrides the renewal cadence; test-oriented.
	pub fn with_renewal_interval(mut self, interval: StdDuration) -> Self {
		self.renewal_interval = interval;

		self
	}

	/// Handle to the session store this driver writes.
	pub fn handle(&self) -> &SessionHandle {
		&self.handle
	}

	/// Runs the startup silent check and spawns the background scheduler.
	///
	/// Idempotent: a second invocation is a no-op returning the current
	/// snapshot - no duplicate timers, no duplicate profile fetches. Any
	/// handshake failure degrades to an anonymous session; startup never
	/// fails on provider trouble.
	pub async fn initialize(&self) -> SessionState {
		if self.started.swap(true, Ordering::SeqCst) {
			return self.handle.snapshot();
		}

		let outcome = match self.provider.check_session().await {
			Ok(handshake) => handshake,
			Err(err) => {
				warn!(error = %err, "Silent session check failed; continuing logged out.");

				Handshake::Anonymous
			},
		};
		let token = match &outcome {
			Handshake::Authenticated(credential) => {
				*self.shared.expiry.lock() = Some(credential.expires_at);

				self.shared.login_latch.store(false, Ordering::SeqCst);

				Some(credential.access_token.clone())
			},
			Handshake::Anonymous => None,
		};

		self.handle.apply(SessionEvent::HandshakeCompleted(outcome));

		if let Some(token) = token {
			let provider = self.provider.clone();
			let handle = self.handle.clone();

			tokio::spawn(async move {
				match provider.fetch_profile(&token).await {
					Ok(profile) => handle.apply(SessionEvent::ProfileLoaded(profile)),
					// Profile is display-only; its absence is never surfaced.
					Err(err) => debug!(error = %err, "Profile fetch failed."),
				}
			});
		}

		self.spawn_renewal();

		self.handle.snapshot()
	}

	/// Emits an interactive login directive carrying the replay location.
	pub fn login(&self, replay: Option<&str>) {
		let redirect = self.provider.login_url(&self.redirect_uri, replay);
		let _ = self.directives.send(Directive::RedirectLogin(Box::new(redirect)));
	}

	/// Emits an interactive logout directive returning to the app origin.
	pub fn logout(&self) {
		let url = self.provider.logout_url(&self.redirect_uri);
		let _ = self.directives.send(Directive::RedirectLogout(url));
	}

	/// Cancels the renewal scheduler so no callback fires against a
	/// torn-down store.
	pub fn shutdown(&self) {
		if let Some(task) = self.renewal_task.lock().take() {
			task.abort();
		}
	}

	fn spawn_renewal(&self) {
		let provider = self.provider.clone();
		let handle = self.handle.clone();
		let shared = self.shared.clone();
		let directives = self.directives.clone();
		let redirect_uri = self.redirect_uri.clone();
		let period = self.renewal_interval;
		let task = tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);

			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
			// The first tick resolves immediately; the handshake just ran.
			interval.tick().await;

			loop {
				interval.tick().await;
				renew_if_stale(&provider, &handle, &shared, &directives, &redirect_uri).await;
			}
		});

		*self.renewal_task.lock() = Some(task);
	}
}
impl Drop for SessionDriver {
	fn drop(&mut self) {
		self.shutdown();
	}
}
impl Debug for SessionDriver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionDriver")
			.field("redirect_uri", &self.redirect_uri)
			.field("renewal_interval", &self.renewal_interval)
			.field("started", &self.started.load(Ordering::SeqCst))
			.finish()
	}
}

struct DriverShared {
	expiry: Mutex<Option<OffsetDateTime>>,
	login_latch: AtomicBool,
	renewal_guard: AsyncMutex<()>,
}

async fn renew_if_stale(
	provider: &Arc<dyn IdentityProvider>,
	handle: &SessionHandle,
	shared: &DriverShared,
	directives: &UnboundedSender<Directive>,
	redirect_uri: &Url,
) {
	let _flight = shared.renewal_guard.lock().await;

	if !handle.snapshot().authenticated {
		return;
	}

	let now = OffsetDateTime::now_utc();

	// Unknown expiry while authenticated renews every tick; better a spare
	// exchange than a stale credential on a booking call.
	if let Some(expiry) = *shared.expiry.lock() {
		if expiry - now > FRESHNESS_WINDOW {
			return;
		}
	}

	match provider.renew().await {
		Ok(credential) => {
			*shared.expiry.lock() = Some(credential.expires_at);

			shared.login_latch.store(false, Ordering::SeqCst);
			debug!("Access token renewed.");
			handle.apply(SessionEvent::TokenRenewed(credential.access_token));
		},
		Err(err) => {
			warn!(error = %err, "Token renewal failed; escalating to interactive login.");

			// Reset first so any observer reacting to the directive already
			// sees the unauthenticated snapshot.
			*shared.expiry.lock() = None;

			handle.apply(SessionEvent::SessionExpired);

			if !shared.login_latch.swap(true, Ordering::SeqCst) {
				let redirect = provider.login_url(redirect_uri, None);
				let _ = directives.send(Directive::RedirectLogin(Box::new(redirect)));
			}
		},
	}
}
