//! Session-core error types shared across the provider adapter and lifecycle.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical session-core error exposed by public APIs.
///
/// Handshake-time errors never escape the lifecycle layer (they degrade to an
/// anonymous session); renewal-time errors escalate to an interactive login.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Temporary upstream failure while talking to the identity provider.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Provider rejected the session grant (e.g., expired or revoked refresh secret).
	#[error("Provider rejected the session grant: {reason}.")]
	InvalidGrant {
		/// Provider- or core-supplied reason string.
		reason: String,
	},
}

/// Temporary failure variants raised by provider endpoints.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or core-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Userinfo endpoint rejected the profile fetch or returned garbage.
	#[error("Userinfo endpoint returned an unexpected response: {message}.")]
	Userinfo {
		/// Provider- or core-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
impl From<ReqwestError> for Error {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			TransientError::TokenEndpoint {
				message: "Request timed out while calling the identity provider".into(),
				status: e.status().map(|code| code.as_u16()),
			}
			.into()
		} else {
			TransportError::from(e).into()
		}
	}
}
