//! Demonstrates a guardian session over the default reqwest transport: login, a rejected
//! access token renewed behind the scenes, and sign-out.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use guardian_client::{
	auth::GuardianId,
	client::ReqwestAuthenticatedClient,
	service::{ServiceDescriptor, paths},
	session::Session,
	store::{MemoryStore, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(paths::GUARDIAN_LOGIN);
			then.status(200).header("content-type", "application/json").body(
				r#"{"status":200,"data":{"token":{"accessToken":"demo-a1","refreshToken":"demo-r1"}}}"#,
			);
		})
		.await;
	let expired_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer demo-a1");
			then.status(401);
		})
		.await;
	let renew_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(paths::RENEW).header("authorization", "Bearer demo-r1");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"data":{"accessToken":"demo-a2","refreshToken":"demo-r2"}}"#);
		})
		.await;
	let list_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer demo-a2");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"data":[{"takerIdx":7,"takerName":"Grandma","deviceId":"4821937"}]}"#);
		})
		.await;
	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::default());
	let session = Arc::new(Session::restore(store).await?);
	let service = ServiceDescriptor::builder().base_url_str(&server.base_url())?.build()?;
	let client = ReqwestAuthenticatedClient::new(session, service);

	client.login(&GuardianId::new("guardian01")?, "demo-password").await?;

	for taker in client.list_takers().await? {
		println!(
			"Taker {} ({}) is connected to device {}.",
			taker.taker_idx,
			taker.taker_name.as_deref().unwrap_or("unnamed"),
			taker.device_id.as_deref().unwrap_or("none"),
		);
	}

	println!(
		"Renewals attempted: {}, reused: {}.",
		client.renewal_metrics.attempts(),
		client.renewal_metrics.reused()
	);

	client.logout().await?;

	login_mock.assert_async().await;
	expired_mock.assert_async().await;
	renew_mock.assert_async().await;
	list_mock.assert_async().await;

	Ok(())
}
