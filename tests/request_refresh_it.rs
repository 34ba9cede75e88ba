#![cfg(feature = "reqwest")]

mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
// self
use guardian_client::{
	auth::{CredentialPair, TokenSecret},
	client::AuthenticatedClient,
	error::Error,
	http::{ApiRequest, ReqwestHttpClient},
	session::Session,
	transport::ReqwestTransportErrorMapper,
	oauth2::http::{HeaderName, HeaderValue},
	service::paths,
	store::MemoryStore,
};

const RENEWED: &str = r#"{"data":{"token":{"accessToken":"a2","refreshToken":"r2"}}}"#;

#[tokio::test]
async fn valid_token_returns_first_response_without_renewal() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let list = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer a1");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let renew = server
		.mock_async(|when, then| {
			when.method(POST).path(paths::RENEW);
			then.status(200).body(RENEWED);
		})
		.await;
	let response = client
		.request(ApiRequest::get(client.service.endpoint(paths::TAKER_LIST)))
		.await
		.expect("Authorized request should succeed.");

	assert_eq!(response.status.as_u16(), 200);
	assert_eq!(response.text(), "[]");

	list.assert_calls_async(1).await;
	renew.assert_calls_async(0).await;
}

#[tokio::test]
async fn unauthorized_renews_once_and_retries_once() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer a1");
			then.status(401);
		})
		.await;
	let renew = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(paths::RENEW)
				.header("authorization", "Bearer r1")
				.header("content-type", "application/json");
			then.status(200).header("content-type", "application/json").body(RENEWED);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer a2");
			then.status(200).body(r#"{"data":[]}"#);
		})
		.await;
	let response = client
		.request(ApiRequest::get(client.service.endpoint(paths::TAKER_LIST)))
		.await
		.expect("Request should recover from 401.");

	assert_eq!(response.status.as_u16(), 200);

	rejected.assert_calls_async(1).await;
	renew.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;

	assert_eq!(common::stored_pair(&store).await, Some(("a2".into(), "r2".into())));
}

#[tokio::test]
async fn renewal_without_new_refresh_token_keeps_the_old_one() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer a1");
			then.status(401);
		})
		.await;

	let renew = server
		.mock_async(|when, then| {
			when.method(POST).path(paths::RENEW).header("authorization", "Bearer r1");
			then.status(200).body(r#"{"data":{"accessToken":"a2"}}"#);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer a2");
			then.status(200).body("[]");
		})
		.await;
	client
		.request(ApiRequest::get(client.service.endpoint(paths::TAKER_LIST)))
		.await
		.expect("Request should recover from 401.");

	renew.assert_calls_async(1).await;

	assert_eq!(common::stored_pair(&store).await, Some(("a2".into(), "r1".into())));
	assert_eq!(client.session.refresh_token().map(|t| t.expose().to_owned()), Some("r1".into()));
}

#[tokio::test]
async fn second_unauthorized_is_returned_without_another_renewal() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST);
			then.status(401).body(r#"{"message":"forbidden taker"}"#);
		})
		.await;
	let renew = server
		.mock_async(|when, then| {
			when.method(POST).path(paths::RENEW);
			then.status(200).body(RENEWED);
		})
		.await;
	let response = client
		.request(ApiRequest::get(client.service.endpoint(paths::TAKER_LIST)))
		.await
		.expect("Second 401 should be returned as a response.");

	assert!(response.is_unauthorized());
	assert!(response.text().contains("forbidden taker"));

	protected.assert_calls_async(2).await;
	renew.assert_calls_async(1).await;
}

#[tokio::test]
async fn caller_authorization_header_is_overridden() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let spoofed = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer caller");
			then.status(418);
		})
		.await;
	let genuine = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(paths::TAKER_LIST)
				.header("authorization", "Bearer a1")
				.header("x-request-id", "req-9");
			then.status(200).body("[]");
		})
		.await;
	let request = ApiRequest::get(client.service.endpoint(paths::TAKER_LIST))
		.header(HeaderName::from_static("x-request-id"), HeaderValue::from_static("req-9"))
		.header(
			HeaderName::from_bytes(b"Authorization").expect("Header name should parse."),
			HeaderValue::from_static("Bearer caller"),
		);
	let response = client.request(request).await.expect("Request should succeed.");

	assert_eq!(response.status.as_u16(), 200);

	spoofed.assert_calls_async(0).await;
	genuine.assert_calls_async(1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unauthorized_requests_share_one_renewal() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer a1");
			then.status(401);
		})
		.await;

	let renew = server
		.mock_async(|when, then| {
			when.method(POST).path(paths::RENEW).header("authorization", "Bearer r1");
			then.status(200).delay(Duration::from_millis(50)).body(RENEWED);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer a2");
			then.status(200).body("[]");
		})
		.await;
	let tasks: Vec<_> = (0..6)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move {
				client.request(ApiRequest::get(client.service.endpoint(paths::TAKER_LIST))).await
			})
		})
		.collect();

	for task in tasks {
		let response = task
			.await
			.expect("Request task should not panic.")
			.expect("Every concurrent request should succeed.");

		assert_eq!(response.status.as_u16(), 200);
	}

	renew.assert_calls_async(1).await;
	accepted.assert_calls_async(6).await;

	assert_eq!(client.renewal_metrics.attempts(), 1);
	assert_eq!(common::stored_pair(&store).await, Some(("a2".into(), "r2".into())));
}

#[tokio::test]
async fn refresh_reads_every_recognized_shape() {
	for body in [
		r#"{"data":{"token":{"accessToken":"a2","refreshToken":"r2"}}}"#,
		r#"{"data":{"accessToken":"a2","refreshToken":"r2"}}"#,
		r#"{"accessToken":"a2","refreshToken":"r2"}"#,
	] {
		let server = MockServer::start_async().await;
		let store = MemoryStore::default();
		let client = common::reqwest_client(&server, &store, None).await;
		let renew = server
			.mock_async(|when, then| {
				when.method(POST).path(paths::RENEW).header("authorization", "Bearer r1");
				then.status(200).header("content-type", "application/json").body(body);
			})
			.await;
		let pair = client
			.refresh(&TokenSecret::from("r1"))
			.await
			.unwrap_or_else(|e| panic!("Shape {body} should renew: {e}."));

		assert!(pair.same_tokens(&CredentialPair::new("a2", "r2")));

		renew.assert_async().await;
	}
}

#[tokio::test]
async fn refresh_rejects_unrecognized_shape() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client = common::reqwest_client(&server, &store, None).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(paths::RENEW);
			then.status(200).body(r#"{"result":{"jwt":"a2"}}"#);
		})
		.await;

	let err = client
		.refresh(&TokenSecret::from("r1"))
		.await
		.expect_err("Unrecognized shape should be rejected.");

	assert!(matches!(err, Error::MalformedRenewalResponse { .. }));
	assert!(err.requires_login());
	assert_eq!(common::stored_pair(&store).await, None);
}

#[tokio::test]
async fn timed_out_request_is_a_transport_error() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let session = Arc::new(Session::new(Arc::new(store.clone())));

	session.sign_in(CredentialPair::new("a1", "r1")).await.expect("Sign-in should persist.");

	let client: AuthenticatedClient<ReqwestHttpClient, ReqwestTransportErrorMapper> =
		AuthenticatedClient::with_http_client(
			session,
			common::service_for(&server),
			ReqwestHttpClient::with_timeout(Duration::from_millis(50))
				.expect("Reqwest client should build successfully."),
			Arc::new(ReqwestTransportErrorMapper),
		);
	let slow = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST);
			then.status(200).delay(Duration::from_millis(500)).body("[]");
		})
		.await;
	let err = client
		.request(ApiRequest::get(client.service.endpoint(paths::TAKER_LIST)))
		.await
		.expect_err("Slow response should time out.");

	assert!(matches!(err, Error::Transport(_)));
	assert!(!err.requires_login());

	slow.assert_calls_async(1).await;
}
