#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use guardian_client::{
	api::{GuardianSignUp, ScheduleDraft, ScheduleIdx, TakerIdx},
	auth::{CredentialPair, GuardianId},
	error::Error,
	service::paths,
	store::{MemoryStore, SessionStore, StoreKey},
};

fn draft() -> ScheduleDraft {
	ScheduleDraft {
		title: "Aspirin".into(),
		description: "After breakfast".into(),
		start_time: "2025-03-01".into(),
		end_time: "2025-03-31".into(),
		notice_time: vec!["08:30".into()],
	}
}

fn taker(idx: u64) -> TakerIdx {
	TakerIdx::new(idx).expect("Taker index fixture should be valid.")
}

#[tokio::test]
async fn login_persists_pair_and_guardian_id() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client = common::reqwest_client(&server, &store, None).await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(paths::GUARDIAN_LOGIN)
				.header_missing("authorization")
				.json_body(json!({ "guardianId": "guardian01", "guardianPassword": "pw" }));
			then.status(200).header("content-type", "application/json").json_body(json!({
				"status": 200,
				"data": { "token": { "accessToken": "a1", "refreshToken": "r1" } }
			}));
		})
		.await;
	let guardian = GuardianId::new("guardian01").expect("Guardian id fixture should be valid.");
	let pair = client.login(&guardian, "pw").await.expect("Login should succeed.");

	login.assert_async().await;

	assert!(pair.same_tokens(&CredentialPair::new("a1", "r1")));
	assert!(client.session.is_signed_in());
	assert_eq!(common::stored_pair(&store).await, Some(("a1".into(), "r1".into())));
	assert_eq!(
		store.get(StoreKey::GuardianId).await.expect("Guardian id should load."),
		Some("guardian01".into())
	);
}

#[tokio::test]
async fn rejected_login_leaves_session_signed_out() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client = common::reqwest_client(&server, &store, None).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(paths::GUARDIAN_LOGIN);
			then.status(401).body(r#"{"message":"wrong password"}"#);
		})
		.await;

	let guardian = GuardianId::new("guardian01").expect("Guardian id fixture should be valid.");
	let err = client.login(&guardian, "bad").await.expect_err("Login should fail.");

	assert!(matches!(err, Error::Remote { status: 401, .. }));
	assert!(err.requires_login());
	assert!(!client.session.is_signed_in());
	assert_eq!(common::stored_pair(&store).await, None);
}

#[tokio::test]
async fn register_guardian_validates_before_sending() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client = common::reqwest_client(&server, &store, None).await;
	let register = server
		.mock_async(|when, then| {
			when.method(POST).path(paths::GUARDIAN_REGISTER).json_body(json!({
				"guardianId": "guardian01",
				"guardianPassword": "pw",
				"guardianPasswordConfirm": "pw",
				"guardianName": "Kim"
			}));
			then.status(201).body(r#"{"message":"registered"}"#);
		})
		.await;
	let guardian = GuardianId::new("guardian01").expect("Guardian id fixture should be valid.");
	let mismatched = GuardianSignUp {
		guardian_id: guardian.clone(),
		password: "pw".into(),
		password_confirm: "other".into(),
		name: "Kim".into(),
	};

	assert!(matches!(
		client.register_guardian(&mismatched).await,
		Err(Error::InvalidInput { .. })
	));

	let form = GuardianSignUp { password_confirm: "pw".into(), name: " Kim ".into(), ..mismatched };
	let message = client.register_guardian(&form).await.expect("Registration should succeed.");

	assert_eq!(message.as_deref(), Some("registered"));

	register.assert_calls_async(1).await;
}

#[tokio::test]
async fn takers_decode_from_either_list_shape() {
	for body in [
		r#"[{"takerIdx":1,"takerName":"Grandma"},{"takerIdx":"2"}]"#,
		r#"{"status":200,"data":[{"takerIdx":1,"takerName":"Grandma"},{"takerIdx":"2"}]}"#,
	] {
		let server = MockServer::start_async().await;
		let store = MemoryStore::default();
		let client =
			common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;

		server
			.mock_async(|when, then| {
				when.method(GET).path(paths::TAKER_LIST).header("authorization", "Bearer a1");
				then.status(200).header("content-type", "application/json").body(body);
			})
			.await;

		let takers = client.list_takers().await.expect("Taker list should decode.");

		assert_eq!(takers.len(), 2);
		assert_eq!(takers[0].taker_idx, taker(1));
		assert_eq!(takers[0].taker_name.as_deref(), Some("Grandma"));
		assert_eq!(takers[1].taker_idx, taker(2));
		assert_eq!(takers[1].taker_name, None);
	}
}

#[tokio::test]
async fn schedules_are_filtered_by_taker_query() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let filtered = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::SCHEDULE).query_param("user", "7");
			then.status(200).body(
				r#"{"data":[
					{"scheduleIdx":11,"takerIdx":7,"title":"Aspirin","noticeTime":["08:30"]},
					{"scheduleIdx":12,"takerIdx":8,"title":"Vitamin"},
					{"scheduleIdx":13,"title":"Unowned"}
				]}"#,
			);
		})
		.await;
	let schedules =
		client.list_schedules(Some(taker(7))).await.expect("Schedule list should decode.");
	let indices: Vec<_> = schedules.iter().map(|schedule| schedule.schedule_idx.get()).collect();

	filtered.assert_async().await;

	assert_eq!(indices, [11, 13]);
	assert_eq!(schedules[0].notice_time, ["08:30"]);
}

#[tokio::test]
async fn empty_schedule_body_is_an_empty_list() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let all = server
		.mock_async(|when, then| {
			when.method(GET).path(paths::SCHEDULE).query_param_missing("user");
			then.status(200);
		})
		.await;

	assert!(client.list_schedules(None).await.expect("Empty body should decode.").is_empty());

	all.assert_async().await;
}

#[tokio::test]
async fn schedule_mutations_send_json_bodies() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let draft_json = json!({
		"title": "Aspirin",
		"description": "After breakfast",
		"startTime": "2025-03-01",
		"endTime": "2025-03-31",
		"noticeTime": ["08:30"]
	});
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(paths::SCHEDULE)
				.header("authorization", "Bearer a1")
				.json_body(json!({ "takerIdx": 7, "schedules": [draft_json.clone()] }));
			then.status(201);
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(PATCH).path(paths::SCHEDULE).json_body(json!({
				"scheduleIdx": 11,
				"takerIdx": 7,
				"schedule": draft_json.clone()
			}));
			then.status(200);
		})
		.await;
	let delete = server
		.mock_async(|when, then| {
			when.method(DELETE).path(paths::SCHEDULE).json_body(json!({ "scheduleIdx": 11 }));
			then.status(204);
		})
		.await;
	let schedule = ScheduleIdx::new(11).expect("Schedule index fixture should be valid.");

	client.create_schedules(taker(7), &[draft()]).await.expect("Create should succeed.");
	client.update_schedule(schedule, taker(7), &draft()).await.expect("Update should succeed.");
	client.delete_schedule(schedule).await.expect("Delete should succeed.");

	create.assert_async().await;
	update.assert_async().await;
	delete.assert_async().await;
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_network() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let any = server
		.mock_async(|when, then| {
			when.any_request();
			then.status(200);
		})
		.await;

	assert!(matches!(
		client.create_schedules(taker(7), &[]).await,
		Err(Error::InvalidInput { .. })
	));
	assert!(matches!(client.register_taker("   ").await, Err(Error::InvalidInput { .. })));
	assert!(matches!(client.register_taker(" K ").await, Err(Error::InvalidInput { .. })));
	assert!(matches!(
		client.connect_taker(taker(7), " 1234 ").await,
		Err(Error::InvalidInput { .. })
	));

	any.assert_calls_async(0).await;
}

#[tokio::test]
async fn taker_registration_and_connection() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;
	let register = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(paths::TAKER_REGISTER)
				.json_body(json!({ "takerName": "Grandma" }));
			then.status(201).body(r#"{"data":{"takerIdx":7}}"#);
		})
		.await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(paths::TAKER_CONNECT)
				.json_body(json!({ "takerIdx": 7, "deviceId": "4821937" }));
			then.status(200);
		})
		.await;
	let body = client.register_taker(" Grandma ").await.expect("Taker should register.");

	assert_eq!(body["data"]["takerIdx"], 7);

	client.connect_taker(taker(7), " 4821937 ").await.expect("Taker should connect.");

	register.assert_async().await;
	connect.assert_async().await;
}

#[tokio::test]
async fn server_errors_surface_as_remote() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(paths::TAKER_LIST);
			then.status(500).body("boom");
		})
		.await;

	match client.list_takers().await {
		Err(Error::Remote { status, body }) => {
			assert_eq!(status, 500);
			assert_eq!(body, "boom");
		},
		other => panic!("Unexpected result: {other:?}."),
	}
}

#[tokio::test]
async fn logout_clears_session() {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let client =
		common::reqwest_client(&server, &store, Some(CredentialPair::new("a1", "r1"))).await;

	client.logout().await.expect("Logout should succeed.");

	assert!(!client.session.is_signed_in());
	assert_eq!(common::stored_pair(&store).await, None);
	assert!(matches!(client.list_takers().await, Err(Error::NoCredential)));
}
