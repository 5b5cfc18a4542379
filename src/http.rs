//! Shared API client with lazy bearer-credential injection.
//!
//! Page-level code talks to the marketplace REST API through [`ApiClient`];
//! none of those call sites know about authentication. The client holds a
//! token *supplier*, never a token value: the supplier is resolved every time
//! a request is built, so a mid-session renewal is reflected on the very next
//! call without re-registration. Public endpoints simply see no header while
//! the supplier returns nothing.

// crates.io
use reqwest::{Method, RequestBuilder};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Zero-argument callable resolving the current bearer credential.
pub type TokenSupplier = Arc<dyn Fn() -> Option<TokenSecret> + Send + Sync>;

/// HTTP client for the marketplace REST API.
pub struct ApiClient {
	http: ReqwestClient,
	base_url: String,
	supplier: RwLock<Option<TokenSupplier>>,
}
impl ApiClient {
	/// Creates a client for the provided API base URL.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self::with_client(base_url, ReqwestClient::new())
	}

	/// Creates a client that reuses the caller-provided HTTP client.
	pub fn with_client(base_url: impl Into<String>, http: ReqwestClient) -> Self {
		Self { http, base_url: base_url.into(), supplier: RwLock::new(None) }
	}

	/// Installs the token supplier. Called once at startup; a repeat call
	/// replaces the supplier instead of stacking another hook.
	pub fn attach_token_supplier(&self, supplier: TokenSupplier) {
		*self.supplier.write() = Some(supplier);
	}

	/// Builds a request against `path` (joined onto the base URL), attaching
	/// `Authorization: Bearer <token>` iff the supplier currently returns a
	/// token.
	pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
		let url = join_url(&self.base_url, path);
		let builder = self.http.request(method, url);

		match self.supplier.read().as_ref().and_then(|supplier| supplier()) {
			Some(token) => builder.bearer_auth(token.expose()),
			None => builder,
		}
	}

	/// Convenience GET builder.
	pub fn get(&self, path: &str) -> RequestBuilder {
		self.request(Method::GET, path)
	}

	/// Convenience POST builder.
	pub fn post(&self, path: &str) -> RequestBuilder {
		self.request(Method::POST, path)
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.base_url)
			.field("supplier_attached", &self.supplier.read().is_some())
			.finish()
	}
}

fn join_url(base: &str, path: &str) -> String {
	format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn authorization_header(builder: RequestBuilder) -> Option<String> {
		let request = builder.build().expect("Request should build successfully.");

		request
			.headers()
			.get(reqwest::header::AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.map(ToOwned::to_owned)
	}

	#[test]
	fn requests_without_supplier_stay_unauthenticated() {
		let client = ApiClient::new("http://localhost:8080/api");

		assert!(authorization_header(client.get("/vendors")).is_none());
	}

	#[test]
	fn supplier_is_resolved_per_request_not_at_registration() {
		let client = ApiClient::new("http://localhost:8080/api");
		let current: Arc<Mutex<Option<TokenSecret>>> = Arc::new(Mutex::new(None));
		let source = current.clone();

		client.attach_token_supplier(Arc::new(move || source.lock().clone()));

		assert!(authorization_header(client.get("/bookings")).is_none());

		*current.lock() = Some(TokenSecret::new("token-a"));

		assert_eq!(
			authorization_header(client.get("/bookings")).as_deref(),
			Some("Bearer token-a"),
		);

		// Mid-session renewal: visible on the next request, no re-registration.
		*current.lock() = Some(TokenSecret::new("token-b"));

		assert_eq!(
			authorization_header(client.get("/bookings")).as_deref(),
			Some("Bearer token-b"),
		);
	}

	#[test]
	fn base_url_and_path_join_without_double_slashes() {
		let client = ApiClient::new("http://localhost:8080/api/");
		let request =
			client.get("/events/42").build().expect("Request should build successfully.");

		assert_eq!(request.url().as_str(), "http://localhost:8080/api/events/42");
	}
}
