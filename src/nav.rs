//! Role-gated navigation decisions.
//!
//! Every navigation attempt reduces to a pure function of the session
//! snapshot, the route's declared guard(s), and the requested location. The
//! host re-evaluates on every navigation and on every session change, so a
//! background renewal failure on an open protected page immediately flips
//! `Allowed` into `RedirectLogin`.

// self
use crate::{_prelude::*, auth::RoleSet, session::SessionState};

/// Outcome of evaluating a navigation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
	/// Session not yet initialized: render a waiting indicator, do not
	/// redirect, do not render protected content.
	Pending,
	/// Render the requested content.
	Allowed,
	/// Redirect to login, carrying the originally-requested location so it
	/// can be replayed after a successful login.
	RedirectLogin {
		/// Location the user asked for.
		from: String,
	},
	/// Redirect to the unauthorized page.
	RedirectUnauthorized,
}
impl RouteDecision {
	/// Stable label suitable for span or log fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			RouteDecision::Pending => "pending",
			RouteDecision::Allowed => "allowed",
			RouteDecision::RedirectLogin { .. } => "redirect_login",
			RouteDecision::RedirectUnauthorized => "redirect_unauthorized",
		}
	}
}
impl Display for RouteDecision {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Declarative per-route guard: the set of roles permitted to enter.
///
/// An empty required set admits any authenticated session; the role
/// predicate is not consulted at all in that case.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteGuard {
	required: RoleSet,
}
impl RouteGuard {
	/// Guard admitting any authenticated session.
	pub fn any_authenticated() -> Self {
		Self::default()
	}

	/// Guard requiring at least one of the provided roles.
	pub fn require<I, S>(roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self { required: RoleSet::new(roles) }
	}

	/// Roles this guard requires; empty means authentication only.
	pub fn required(&self) -> &RoleSet {
		&self.required
	}

	/// Evaluates the guard against a session snapshot for `location`.
	pub fn evaluate(&self, state: &SessionState, location: &str) -> RouteDecision {
		if !state.initialized {
			return RouteDecision::Pending;
		}
		if !state.authenticated {
			return RouteDecision::RedirectLogin { from: location.to_owned() };
		}
		if !self.required.is_empty() && !state.roles.intersects(&self.required) {
			return RouteDecision::RedirectUnauthorized;
		}

		RouteDecision::Allowed
	}
}

/// Ordered outer-to-inner guard list for nested route declarations.
///
/// Evaluation short-circuits on the first non-[`RouteDecision::Allowed`]
/// outcome, so failing an outer gate is decided before any inner gate runs.
#[derive(Clone, Debug, Default)]
pub struct GuardChain(Vec<RouteGuard>);
impl GuardChain {
	/// Builds a chain from outermost to innermost guard.
	pub fn new(guards: impl IntoIterator<Item = RouteGuard>) -> Self {
		Self(guards.into_iter().collect())
	}

	/// Appends an inner guard.
	pub fn push(mut self, guard: RouteGuard) -> Self {
		self.0.push(guard);

		self
	}

	/// Evaluates all guards outer-to-inner with short-circuiting.
	pub fn evaluate(&self, state: &SessionState, location: &str) -> RouteDecision {
		for guard in &self.0 {
			let decision = guard.evaluate(state, location);

			if decision != RouteDecision::Allowed {
				return decision;
			}
		}

		RouteDecision::Allowed
	}
}
