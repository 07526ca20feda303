use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
  response::Response,
};
use chrono::Duration;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use yuletide_core::{
  account::{NewAccount, SignupOutcome},
  guard::Guard,
  store::{AccountStore, BellStore},
};
use yuletide_store_sqlite::SqliteStore;

use crate::{ApiConfig, auth::hash_password, bell_router, wall_router};

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn store() -> Arc<SqliteStore> { Arc::new(SqliteStore::open_in_memory().await.unwrap()) }

async fn make_account(store: &SqliteStore, username: &str, superuser: bool) -> i64 {
  let outcome = store
    .create_account(NewAccount {
      username:      username.to_string(),
      email:         format!("{username}@example.com"),
      password_hash: hash_password("hunter2hunter2").unwrap(),
      is_superuser:  superuser,
    })
    .await
    .unwrap();
  match outcome {
    SignupOutcome::Created(a) => a.account_id,
    other => panic!("unexpected signup outcome: {other:?}"),
  }
}

async fn send(
  app:     &Router,
  method:  &str,
  uri:     &str,
  headers: Vec<(header::HeaderName, &str)>,
  body:    &str,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(Body::from(body.to_string())).unwrap();
  app.clone().oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(resp: Response) -> String {
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  String::from_utf8(bytes.to_vec()).unwrap()
}

/// Log in over JSON and return the bearer token.
async fn login(app: &Router, username: &str) -> String {
  let body = json!({ "username": username, "password": "hunter2hunter2" }).to_string();
  let resp = send(
    app,
    "POST",
    "/login/",
    vec![(header::CONTENT_TYPE, "application/json")],
    &body,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  json_body(resp).await["token"].as_str().unwrap().to_string()
}

async fn wall_login(app: &Router, username: &str) -> String {
  let body = json!({ "username": username, "password": "hunter2hunter2" }).to_string();
  let resp = send(
    app,
    "POST",
    "/accounts/login/",
    vec![(header::CONTENT_TYPE, "application/json")],
    &body,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  json_body(resp).await["token"].as_str().unwrap().to_string()
}

fn post_snowball<'a>(ip: &'a str, extra: Option<&'a str>) -> Vec<(header::HeaderName, &'a str)> {
  let mut headers = vec![
    (header::CONTENT_TYPE, "application/json"),
    (header::HeaderName::from_static("x-forwarded-for"), ip),
  ];
  if let Some(auth) = extra {
    headers.push((header::AUTHORIZATION, auth));
  }
  headers
}

// ─── Wall ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn wall_accepts_one_snowball_per_address() {
  let app = wall_router(store().await, ApiConfig::default());

  let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.1", None), r#"{"content":"  눈사람  "}"#).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["status"], "success");
  assert_eq!(body["content"], "눈사람");

  let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.1", None), r#"{"content":"again"}"#).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert!(json_body(resp).await["error"].is_string());

  let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.2", None), r#"{"content":"other"}"#).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = send(&app, "GET", "/get_messages/", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["messages"], json!(["눈사람", "other"]));
}

#[tokio::test]
async fn wall_rejects_empty_and_long_content() {
  let app = wall_router(store().await, ApiConfig::default());

  let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.3", None), r#"{"content":"   "}"#).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.3", None), r#"{}"#).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let long = json!({ "content": "a".repeat(16) }).to_string();
  let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.3", None), &long).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  // Rejected attempts do not use up the address.
  let ok = json!({ "content": "a".repeat(15) }).to_string();
  let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.3", None), &ok).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn wall_malformed_json_is_a_server_error() {
  let app = wall_router(store().await, ApiConfig::default());
  let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.4", None), "{not json").await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  assert!(json_body(resp).await["error"].is_string());
}

#[tokio::test]
async fn wall_add_message_only_accepts_post() {
  let app = wall_router(store().await, ApiConfig::default());
  let resp = send(&app, "GET", "/add_message/", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
  assert!(json_body(resp).await["error"].is_string());
}

#[tokio::test]
async fn wall_superuser_may_post_repeatedly() {
  let store = store().await;
  make_account(&store, "admin", true).await;
  let app = wall_router(store, ApiConfig::default());

  let token = wall_login(&app, "admin").await;
  let bearer = format!("Bearer {token}");
  for text in ["one", "two", "three"] {
    let body = json!({ "content": text }).to_string();
    let resp = send(&app, "POST", "/add_message/", post_snowball("198.51.100.9", Some(bearer.as_str())), &body).await;
    assert_eq!(resp.status(), StatusCode::OK, "{text}");
  }

  let resp = send(&app, "GET", "/get_messages/", vec![], "").await;
  assert_eq!(json_body(resp).await["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn wall_home_reports_whether_address_posted() {
  let app = wall_router(store().await, ApiConfig::default());
  let xff = header::HeaderName::from_static("x-forwarded-for");

  let resp = send(&app, "GET", "/", vec![(xff.clone(), "203.0.113.50")], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(text_body(resp).await.contains("data-has-posted=\"false\""));

  send(&app, "POST", "/add_message/", post_snowball("203.0.113.50", None), r#"{"content":"hi"}"#).await;

  let resp = send(&app, "GET", "/", vec![(xff, "203.0.113.50")], "").await;
  assert!(text_body(resp).await.contains("data-has-posted=\"true\""));
}

// ─── Accounts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn form_signup_redirects_to_login() {
  let app = bell_router(store().await, ApiConfig::default());

  let resp = send(
    &app,
    "POST",
    "/signup/",
    vec![(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
    "username=olive&email=olive%40example.com&password=hunter2hunter2",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login/");

  // Same username again re-renders the form with an error.
  let resp = send(
    &app,
    "POST",
    "/signup/",
    vec![(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
    "username=olive&email=other%40example.com&password=hunter2hunter2",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(text_body(resp).await.contains("class=\"error\""));
}

#[tokio::test]
async fn json_signup_validates_input() {
  let app = bell_router(store().await, ApiConfig::default());
  let json_ct = vec![(header::CONTENT_TYPE, "application/json")];

  let body = json!({ "username": "olive", "email": "nope", "password": "hunter2hunter2" }).to_string();
  let resp = send(&app, "POST", "/signup/", json_ct.clone(), &body).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let body = json!({ "username": "olive", "email": "o@example.com", "password": "short" }).to_string();
  let resp = send(&app, "POST", "/signup/", json_ct.clone(), &body).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let body = json!({ "username": "olive", "email": "o@example.com", "password": "hunter2hunter2" }).to_string();
  let resp = send(&app, "POST", "/signup/", json_ct, &body).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let account = json_body(resp).await;
  assert_eq!(account["username"], "olive");
  assert!(account.get("password_hash").is_none());
}

#[tokio::test]
async fn login_sets_cookie_and_logout_clears_it() {
  let store = store().await;
  make_account(&store, "olive", false).await;
  let app = bell_router(store, ApiConfig::default());

  let resp = send(
    &app,
    "POST",
    "/login/",
    vec![(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
    "username=olive&password=hunter2hunter2",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
  assert!(set_cookie.starts_with("yuletide_session="));
  assert!(set_cookie.contains("HttpOnly"));
  let cookie = set_cookie.split(';').next().unwrap().to_string();

  // The cookie authenticates.
  let resp = send(&app, "POST", "/api/strike/", vec![(header::COOKIE, cookie.as_str())], "").await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp = send(&app, "POST", "/logout/", vec![(header::COOKIE, cookie.as_str())], "").await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);

  // The session is gone server-side.
  let resp = send(&app, "POST", "/api/messages/", vec![
    (header::COOKIE, cookie.as_str()),
    (header::CONTENT_TYPE, "application/json"),
  ], r#"{"content":"hi"}"#).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
  let store = store().await;
  make_account(&store, "olive", false).await;
  let app = bell_router(store, ApiConfig::default());

  let body = json!({ "username": "olive", "password": "not-the-password" }).to_string();
  let resp = send(&app, "POST", "/login/", vec![(header::CONTENT_TYPE, "application/json")], &body).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

// ─── Bell ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn server_time_is_close_to_now() {
  let app = bell_router(store().await, ApiConfig::default());
  let resp = send(&app, "GET", "/api/time/", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let ms = json_body(resp).await["server_time"].as_f64().unwrap();
  let now = chrono::Utc::now().timestamp_millis() as f64;
  assert!((now - ms).abs() < 5_000.0, "{ms} vs {now}");
}

#[tokio::test]
async fn strike_requires_login_and_happens_once() {
  let store = store().await;
  make_account(&store, "olive", false).await;
  let app = bell_router(store, ApiConfig::default());

  let resp = send(&app, "POST", "/api/strike/", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let bearer = format!("Bearer {}", login(&app, "olive").await);
  let resp = send(&app, "POST", "/api/strike/", vec![(header::AUTHORIZATION, bearer.as_str())], "").await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body = json_body(resp).await;
  assert_eq!(body["username"], "olive");
  assert!(body["press_time"].is_string());

  let resp = send(&app, "POST", "/api/strike/", vec![(header::AUTHORIZATION, bearer.as_str())], "").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn superuser_may_strike_again() {
  let store = store().await;
  make_account(&store, "root", true).await;
  let app = bell_router(store, ApiConfig::default());

  let bearer = format!("Bearer {}", login(&app, "root").await);
  for _ in 0..2 {
    let resp = send(&app, "POST", "/api/strike/", vec![(header::AUTHORIZATION, bearer.as_str())], "").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }
}

#[tokio::test]
async fn ranking_orders_by_distance_from_target() {
  let store = store().await;
  let config = ApiConfig::default();
  let target = config.target.instant();

  let early = make_account(&store, "early", false).await;
  let close = make_account(&store, "close", false).await;
  let late = make_account(&store, "late", false).await;
  store.strike(early, target - Duration::milliseconds(1_500), Guard::OncePerIdentity).await.unwrap();
  store.strike(close, target + Duration::milliseconds(120), Guard::OncePerIdentity).await.unwrap();
  store.strike(late, target + Duration::seconds(3), Guard::OncePerIdentity).await.unwrap();

  let app = bell_router(store, config);
  let resp = send(&app, "GET", "/api/ranking/", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let records = json_body(resp).await["records"].as_array().unwrap().clone();

  let names: Vec<_> = records.iter().map(|r| r["username"].as_str().unwrap()).collect();
  assert_eq!(names, ["close", "early", "late"]);
  assert_eq!(records[0]["diff_display"], "+0.1200s");
  assert_eq!(records[1]["diff_display"], "-1.5000s");
  assert_eq!(records[2]["diff_display"], "+3.0000s");
}

#[tokio::test]
async fn chat_listing_and_cursor() {
  let store = store().await;
  make_account(&store, "olive", false).await;
  let app = bell_router(store, ApiConfig::default());
  let bearer = format!("Bearer {}", login(&app, "olive").await);
  let headers = || {
    vec![
      (header::AUTHORIZATION, bearer.as_str()),
      (header::CONTENT_TYPE, "application/json"),
    ]
  };

  let resp = send(&app, "POST", "/api/messages/", headers(), r#"{"content":"first"}"#).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let first = json_body(resp).await;
  assert_eq!(first["username"], "olive");
  assert_eq!(first["created_at"].as_str().unwrap().len(), 8);

  let resp = send(&app, "POST", "/api/messages/send/", headers(), r#"{"content":"second"}"#).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["status"], "success");
  assert_eq!(body["message"]["content"], "second");

  let too_long = json!({ "content": "x".repeat(31) }).to_string();
  let resp = send(&app, "POST", "/api/messages/send/", headers(), &too_long).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  // Plain listing: newest first.
  let resp = send(&app, "GET", "/api/messages/", vec![], "").await;
  let listed = json_body(resp).await["messages"].clone();
  assert_eq!(listed[0]["content"], "second");
  assert_eq!(listed[1]["content"], "first");

  // Cursor mode: ascending, strictly after the id.
  let first_id = first["id"].as_i64().unwrap();
  let resp = send(&app, "GET", &format!("/get_messages/?last_id={first_id}"), vec![], "").await;
  let after = json_body(resp).await["messages"].clone();
  assert_eq!(after.as_array().unwrap().len(), 1);
  assert_eq!(after[0]["content"], "second");

  // Garbage cursor is a first load.
  let resp = send(&app, "GET", "/api/messages/?last_id=abc", vec![], "").await;
  let initial = json_body(resp).await["messages"].clone();
  assert_eq!(initial[0]["content"], "first");
  assert_eq!(initial[1]["content"], "second");
}

#[tokio::test]
async fn chat_post_requires_login() {
  let app = bell_router(store().await, ApiConfig::default());
  let resp = send(
    &app,
    "POST",
    "/api/messages/send/",
    vec![(header::CONTENT_TYPE, "application/json")],
    r#"{"content":"hi"}"#,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn heartbeat_counts_logged_in_callers() {
  let store = store().await;
  make_account(&store, "olive", false).await;
  make_account(&store, "basil", false).await;
  let app = bell_router(store, ApiConfig::default());

  let resp = send(&app, "GET", "/api/heartbeat/", vec![], "").await;
  assert_eq!(json_body(resp).await["active_users"], 0);

  for name in ["olive", "basil"] {
    let bearer = format!("Bearer {}", login(&app, name).await);
    send(&app, "GET", "/api/heartbeat/", vec![(header::AUTHORIZATION, bearer.as_str())], "").await;
  }

  // Anonymous callers see the count without adding to it.
  let resp = send(&app, "GET", "/api/heartbeat/", vec![], "").await;
  assert_eq!(json_body(resp).await["active_users"], 2);
}

#[tokio::test]
async fn bell_home_renders() {
  let app = bell_router(store().await, ApiConfig::default());
  let resp = send(&app, "GET", "/", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(text_body(resp).await.contains("New Year Bell"));
}

#[tokio::test]
async fn unknown_paths_are_json_404s() {
  let app = bell_router(store().await, ApiConfig::default());
  let resp = send(&app, "GET", "/nowhere/", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(resp).await["error"], "not found");
}

#[tokio::test]
async fn chat_send_accepts_multipart_form_data() {
  let store = store().await;
  make_account(&store, "olive", false).await;
  let app = bell_router(store, ApiConfig::default());
  let bearer = format!("Bearer {}", login(&app, "olive").await);

  let body = "--XYZ\r\n\
              Content-Disposition: form-data; name=\"content\"\r\n\r\n\
              hello\r\n\
              --XYZ--\r\n";
  let resp = send(
    &app,
    "POST",
    "/api/messages/send/",
    vec![
      (header::AUTHORIZATION, bearer.as_str()),
      (header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ"),
    ],
    body,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["status"], "success");
  assert_eq!(body["message"]["content"], "hello");
  assert_eq!(body["message"]["username"], "olive");
}

#[tokio::test]
async fn login_with_unrepresentable_session_lifetime_is_a_server_error() {
  let store = store().await;
  make_account(&store, "olive", false).await;
  let config = ApiConfig { session_ttl: Duration::days(200_000_000), ..ApiConfig::default() };
  let app = bell_router(store, config);

  let body = json!({ "username": "olive", "password": "hunter2hunter2" }).to_string();
  let resp = send(&app, "POST", "/login/", vec![(header::CONTENT_TYPE, "application/json")], &body).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  assert!(resp.headers().get(header::SET_COOKIE).is_none());
  assert!(json_body(resp).await["error"].is_string());
}

#[tokio::test]
async fn wrong_methods_get_json_405s() {
  let bell = bell_router(store().await, ApiConfig::default());
  for (method, uri) in [
    ("GET", "/api/strike/"),
    ("POST", "/api/heartbeat/"),
    ("DELETE", "/api/ranking/"),
    ("POST", "/api/time/"),
    ("PUT", "/api/messages/"),
    ("GET", "/api/messages/send/"),
    ("POST", "/get_messages/"),
    ("GET", "/logout/"),
  ] {
    let resp = send(&bell, method, uri, vec![], "").await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
    assert_eq!(json_body(resp).await["error"], "method not allowed", "{method} {uri}");
  }

  let wall = wall_router(store().await, ApiConfig::default());
  let resp = send(&wall, "POST", "/get_messages/", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
  assert_eq!(json_body(resp).await["error"], "method not allowed");
}
