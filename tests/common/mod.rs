//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	future::Future,
	io,
	pin::Pin,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use httpmock::MockServer;
// self
use guardian_client::{
	auth::CredentialPair,
	client::AuthenticatedClient,
	http::ApiHttpClient,
	oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{HeaderMap, HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
	},
	service::ServiceDescriptor,
	session::Session,
	store::{self, MemoryStore},
	transport::NetworkErrorMapper,
};
#[cfg(feature = "reqwest")] use guardian_client::client::ReqwestAuthenticatedClient;

/// Client type driven by [`ScriptedTransport`].
pub type ScriptedClient = AuthenticatedClient<ScriptedTransport, NetworkErrorMapper>;

/// Builds a descriptor pointing at the mock server.
pub fn service_for(server: &MockServer) -> ServiceDescriptor {
	ServiceDescriptor::builder()
		.base_url_str(&server.base_url())
		.expect("Mock server base URL should parse successfully.")
		.build()
		.expect("Mock server descriptor should build successfully.")
}

/// Builds a reqwest-backed client over `store`, signed in with `pair` when provided.
#[cfg(feature = "reqwest")]
pub async fn reqwest_client(
	server: &MockServer,
	store: &MemoryStore,
	pair: Option<CredentialPair>,
) -> ReqwestAuthenticatedClient {
	let session = Arc::new(Session::new(Arc::new(store.clone())));

	if let Some(pair) = pair {
		session.sign_in(pair).await.expect("Fixture sign-in should succeed.");
	}

	ReqwestAuthenticatedClient::new(session, service_for(server))
}

/// Reads the persisted pair as plain strings.
pub async fn stored_pair(store: &MemoryStore) -> Option<(String, String)> {
	store::load_credentials(store).await.expect("Loading stored credentials should succeed.").map(
		|pair| (pair.access_token.expose().to_owned(), pair.refresh_token.expose().to_owned()),
	)
}

/// One scripted transport outcome.
#[derive(Clone, Debug)]
pub enum Scripted {
	/// Respond with a status and JSON body.
	Respond(u16, &'static str),
	/// Fail with a transport error.
	Fail(&'static str),
	/// Sign the client's session out, then respond.
	SignOutThenRespond(u16, &'static str),
}

/// Request as observed by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct SeenRequest {
	pub method: Method,
	pub uri: String,
	pub headers: HeaderMap,
	pub body: Vec<u8>,
}

/// Transport that replays scripted outcomes and records every request it sees.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
	script: Arc<Mutex<VecDeque<Scripted>>>,
	seen: Arc<Mutex<Vec<SeenRequest>>>,
	calls: Arc<AtomicUsize>,
	session: Arc<Mutex<Option<Arc<Session>>>>,
}
impl ScriptedTransport {
	pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
		Self { script: Arc::new(Mutex::new(script.into_iter().collect())), ..Default::default() }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn seen(&self) -> Vec<SeenRequest> {
		self.seen.lock().expect("Request log lock should not be poisoned.").clone()
	}

	pub fn client(&self, session: Arc<Session>) -> ScriptedClient {
		*self.session.lock().expect("Session slot lock should not be poisoned.") =
			Some(session.clone());

		let service = ServiceDescriptor::builder()
			.base_url_str("https://backend.test")
			.expect("Scripted base URL should parse successfully.")
			.build()
			.expect("Scripted descriptor should build successfully.");

		AuthenticatedClient::with_http_client(
			session,
			service,
			Arc::new(self.clone()),
			Arc::new(NetworkErrorMapper),
		)
	}
}
impl ApiHttpClient for ScriptedTransport {
	type Handle = ScriptedTransport;
	type TransportError = io::Error;

	fn handle(&self) -> Self::Handle {
		self.clone()
	}
}
impl<'c> AsyncHttpClient<'c> for ScriptedTransport {
	type Error = HttpClientError<io::Error>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			let (parts, body) = request.into_parts();

			self.seen.lock().expect("Request log lock should not be poisoned.").push(SeenRequest {
				method: parts.method,
				uri: parts.uri.to_string(),
				headers: parts.headers,
				body,
			});

			let next = self
				.script
				.lock()
				.expect("Script lock should not be poisoned.")
				.pop_front()
				.expect("Scripted transport ran out of responses.");

			match next {
				Scripted::Respond(status, body) => Ok(scripted_response(status, body)),
				Scripted::Fail(message) =>
					Err(HttpClientError::Reqwest(Box::new(io::Error::other(message)))),
				Scripted::SignOutThenRespond(status, body) => {
					let session = self
						.session
						.lock()
						.expect("Session slot lock should not be poisoned.")
						.clone()
						.expect("Scripted sign-out needs a client session.");

					session.sign_out().await.expect("Scripted sign-out should succeed.");

					Ok(scripted_response(status, body))
				},
			}
		})
	}
}

fn scripted_response(status: u16, body: &str) -> HttpResponse {
	let mut response = HttpResponse::new(body.as_bytes().to_vec());

	*response.status_mut() = StatusCode::from_u16(status).expect("Scripted status should be valid.");
	response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

	response
}
