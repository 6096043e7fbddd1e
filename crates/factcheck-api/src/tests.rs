//! Router tests against an in-memory SQLite store.

use std::sync::{Arc, Mutex};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use factcheck_core::{
  alert::ChatSink,
  statement::{NewSource, NewSpeaker},
  store::EditorialStore,
  user::{NewRole, NewUser, Permission},
};
use factcheck_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, router};

const PASSWORD: &str = "correct horse";

#[derive(Default)]
struct RecordingSink(Mutex<Vec<String>>);

impl ChatSink for RecordingSink {
  fn post(&self, text: String) {
    self.0.lock().unwrap().push(text);
  }
}

struct Harness {
  state:   AppState<SqliteStore>,
  sink:    Arc<RecordingSink>,
  speaker: i64,
  source:  i64,
}

async fn harness() -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(PASSWORD.as_bytes(), &salt)
    .unwrap()
    .to_string();

  let roles = [
    ("admin", vec![
      Permission::StatementsAdd,
      Permission::StatementsEdit,
      Permission::StatementsDelete,
      Permission::StatementsSort,
      Permission::StatementsViewUnapprovedEvaluation,
    ]),
    ("evaluator", vec![
      Permission::StatementsEditAsEvaluator,
      Permission::StatementsViewEvaluationAsEvaluator,
    ]),
    ("proofreader", vec![Permission::StatementsEditAsProofreader]),
  ];
  for (key, permissions) in roles {
    let role = store
      .create_role(NewRole {
        key:         key.into(),
        name:        key.into(),
        permissions: permissions.into_iter().collect(),
      })
      .await
      .unwrap();
    let mut user = NewUser::new(format!("{key}@example.com"), "Test", key, role.id);
    user.password_hash = Some(hash.clone());
    store.create_user(user).await.unwrap();
  }

  let speaker = store
    .create_speaker(NewSpeaker { first_name: "Jan".into(), last_name: "Novak".into() })
    .await
    .unwrap()
    .id;
  let source = store
    .create_source(NewSource { name: "Sunday debate".into(), expert_ids: vec![] })
    .await
    .unwrap()
    .id;

  let sink = Arc::new(RecordingSink::default());
  let state = AppState::new(Arc::new(store), sink.clone(), "https://admin.example.org");
  Harness { state, sink, speaker, source }
}

fn basic(who: &str) -> String {
  format!("Basic {}", B64.encode(format!("{who}@example.com:{PASSWORD}")))
}

impl Harness {
  async fn send(
    &self,
    method: &str,
    uri: &str,
    who: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(who) = who {
      builder = builder.header(header::AUTHORIZATION, basic(who));
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };

    let resp = router(self.state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  async fn create(&self, content: &str) -> i64 {
    let body = json!({
      "content": content,
      "speaker_id": self.speaker,
      "source_id": self.source,
    });
    let (status, json) = self.send("POST", "/statements", Some("admin"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["statement"]["id"].as_i64().unwrap()
  }

  async fn patch(&self, id: i64, who: &str, body: Value) -> (StatusCode, Value) {
    self.send("PATCH", &format!("/statements/{id}"), Some(who), Some(body)).await
  }

  async fn user_id(&self, who: &str) -> i64 {
    self
      .state
      .store
      .find_user_by_email(&format!("{who}@example.com"))
      .await
      .unwrap()
      .unwrap()
      .id
  }
}

fn filled(status: &str) -> Value {
  json!({
    "assessment": {
      "veracity_id": 1,
      "short_explanation": "Pensions rose by 9 %.",
      "explanation_html": "<p>…</p>",
      "evaluation_status": status,
    }
  })
}

// ─── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn ordered_scope_requires_authentication() {
  let h = harness().await;
  let (status, json) = h.send("GET", "/statements", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(json["error"].is_string());

  let (status, _) = h.send("GET", "/statements?scope=published", None, None).await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = h.send("GET", "/statements", Some("evaluator"), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
  let h = harness().await;
  let req = Request::builder()
    .uri("/notifications")
    .header(
      header::AUTHORIZATION,
      format!("Basic {}", B64.encode("admin@example.com:nope")),
    )
    .body(Body::empty())
    .unwrap();
  let resp = router(h.state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn creating_requires_permission() {
  let h = harness().await;
  let body = json!({ "content": "Crime fell", "speaker_id": h.speaker });
  let (status, _) = h.send("POST", "/statements", Some("evaluator"), Some(body)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let id = h.create("Crime fell").await;
  let (status, json) = h.send("GET", &format!("/statements/{id}"), Some("admin"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json["assessment"]["evaluation_status"], "being_evaluated");
}

#[tokio::test]
async fn assigning_an_evaluator_notifies_them() {
  let h = harness().await;
  let id = h.create("Crime fell by half").await;
  let evaluator = h.user_id("evaluator").await;

  let (status, json) =
    h.patch(id, "admin", json!({ "assessment": { "evaluator_id": evaluator } })).await;
  assert_eq!(status, StatusCode::OK, "{json}");
  assert_eq!(json["notifications_created"], 1);
  assert_eq!(json["statement"]["assessment"]["evaluator_id"], evaluator);

  let (_, inbox) = h.send("GET", "/notifications", Some("evaluator"), None).await;
  assert_eq!(inbox.as_array().unwrap().len(), 1);
  let (_, inbox) = h.send("GET", "/notifications", Some("admin"), None).await;
  assert!(inbox.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_transition_is_unprocessable() {
  let h = harness().await;
  let id = h.create("Crime fell by half").await;

  let (status, json) =
    h.patch(id, "admin", json!({ "assessment": { "evaluation_status": "approved" } })).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(json["fields"]["evaluation_status"].as_array().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn unauthorized_change_is_forbidden() {
  let h = harness().await;
  let id = h.create("Crime fell by half").await;

  let (status, _) = h.patch(id, "proofreader", json!({ "published": true })).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_references_are_not_found() {
  let h = harness().await;
  let id = h.create("Crime fell by half").await;

  let (status, _) = h.patch(id, "admin", json!({ "tags": [404] })).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = h.patch(9999, "admin", json!({ "important": true })).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unapproved_evaluation_is_redacted() {
  let h = harness().await;
  let id = h.create("Crime fell by half").await;
  let (status, _) = h.patch(id, "admin", filled("approval_needed")).await;
  assert_eq!(status, StatusCode::OK);

  let uri = format!("/statements/{id}");
  let (_, admin_view) = h.send("GET", &uri, Some("admin"), None).await;
  assert_eq!(admin_view["assessment"]["veracity_id"], 1);

  let (_, proofreader_view) = h.send("GET", &uri, Some("proofreader"), None).await;
  assert!(proofreader_view["assessment"]["veracity_id"].is_null());
  assert!(proofreader_view["assessment"]["short_explanation"].is_null());
  assert_eq!(proofreader_view["assessment"]["evaluation_status"], "approval_needed");

  let (status, _) = h.send("GET", &uri, None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fifth_statement_in_proofreading_posts_an_alert() {
  let h = harness().await;
  for n in 1..=5 {
    let id = h.create(&format!("Statement {n}")).await;
    h.patch(id, "admin", filled("approval_needed")).await;
    let (status, _) =
      h.patch(id, "admin", json!({ "assessment": { "evaluation_status": "proofreading_needed" } }))
        .await;
    assert_eq!(status, StatusCode::OK);
  }

  let posted = h.sink.0.lock().unwrap().clone();
  assert_eq!(posted.len(), 1);
  assert!(posted[0].contains("*Sunday debate*"));
  assert!(posted[0].contains("5 statements"));
  assert!(posted[0].contains(&format!("https://admin.example.org/admin/sources/{}", h.source)));
}

#[tokio::test]
async fn discard_and_reorder() {
  let h = harness().await;
  let a = h.create("A").await;
  let b = h.create("B").await;

  let order = json!({ "statement_ids": [b, a] });
  let uri = format!("/sources/{}/statement-order", h.source);
  let (status, _) = h.send("PUT", &uri, Some("evaluator"), Some(order.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = h.send("PUT", &uri, Some("admin"), Some(order)).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, listed) = h.send("GET", "/statements", Some("admin"), None).await;
  let ids: Vec<i64> = listed
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["statement"]["id"].as_i64().unwrap())
    .collect();
  assert_eq!(ids, vec![b, a]);

  let (status, _) = h.send("DELETE", &format!("/statements/{a}"), Some("admin"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = h.send("GET", &format!("/statements/{a}"), Some("admin"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rating_scales_are_public() {
  let h = harness().await;
  let (status, json) = h.send("GET", "/veracities", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json.as_array().unwrap().len(), 4);

  let (_, json) = h.send("GET", "/promise-ratings", None, None).await;
  assert_eq!(json[0]["key"], "fulfilled");
}

#[tokio::test]
async fn speaker_stats_are_public() {
  let h = harness().await;
  let id = h.create("Pensions rose by a fifth").await;
  h.patch(id, "admin", filled("approval_needed")).await;
  for status in ["proofreading_needed", "approved"] {
    let body = json!({ "assessment": { "evaluation_status": status } });
    let (code, json) = h.patch(id, "admin", body).await;
    assert_eq!(code, StatusCode::OK, "{json}");
  }
  let (code, _) = h.patch(id, "admin", json!({ "published": true })).await;
  assert_eq!(code, StatusCode::OK);

  let uri = format!("/speakers/{}/stats", h.speaker);
  let (status, json) = h.send("GET", &uri, None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json, json!({ "true": 1, "untrue": 0, "misleading": 0, "unverifiable": 0 }));

  let (status, _) = h.send("GET", "/speakers/9999/stats", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Malformed requests ──────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
  let h = harness().await;
  let id = h.create("Crime fell by half").await;

  let (status, json) = h
    .patch(id, "admin", json!({ "assessment": { "evaluation_status": "finished" } }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(json["error"].is_string());
  assert!(json.get("fields").is_none());

  let (status, json) = h.patch(id, "admin", json!({ "published": "yes" })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(json["error"].is_string());

  let (status, json) = h.send("GET", "/statements?scope=everything", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(json["error"].is_string());

  let (status, json) = h.send("GET", "/statements/abc", Some("admin"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(json["error"].is_string());
}
