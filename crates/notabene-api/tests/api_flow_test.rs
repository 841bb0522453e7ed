//! End-to-end API tests against a real database.
//!
//! Each test starts the router on an ephemeral port backed by the test
//! database (`DATABASE_URL` or `DEFAULT_TEST_DATABASE_URL`) and registers
//! fresh users, so tests never share data.

use notabene_api::{build_router, AppState, ServerConfig};
use notabene_crypto::PasswordParams;
use notabene_db::test_fixtures::connect_test_database;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

struct TestServer {
    base: String,
    client: Client,
}

impl TestServer {
    async fn start() -> Self {
        let db = connect_test_database().await;
        let config = ServerConfig {
            rate_limit: None,
            ..ServerConfig::default()
        };
        let state = AppState::new(db, config).with_password_params(PasswordParams::fast());
        let router = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Register a fresh user and return its bearer token.
    async fn register(&self) -> String {
        let username = format!("e2e_{}", Uuid::now_v7().simple());
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({"username": username, "password": "hunter2"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["user"]["username"], username.as_str());
        body["token"].as_str().unwrap().to_string()
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, path, token, None).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, token, Some(body)).await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PUT, path, token, Some(body)).await
    }

    async fn patch(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::PATCH, path, token, None).await
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::DELETE, path, token, None).await
    }
}

fn tag_names(note: &Value) -> Vec<String> {
    note["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with migrated database"]
async fn test_register_login_and_conflict() {
    let server = TestServer::start().await;
    let username = format!("e2e_{}", Uuid::now_v7().simple());
    let credentials = json!({"username": username, "password": "pw"});

    let response = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let again = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let login = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let body: Value = login.json().await.unwrap();
    let token = body["token"].as_str().unwrap();
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = server.get("/api/notes", token).await;
    assert_eq!(status, StatusCode::OK);

    let wrong = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({"username": username, "password": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let body: Value = wrong.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    let unknown = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({"username": format!("{}_x", username), "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with migrated database"]
async fn test_unknown_well_formed_token_is_forbidden() {
    let server = TestServer::start().await;
    let token = notabene_crypto::generate_access_token();
    let (status, body) = server.get("/api/tasks", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with migrated database"]
async fn test_notes_tags_flow() {
    let server = TestServer::start().await;
    let token = server.register().await;

    let (status, note_a) = server
        .post(
            "/api/notes",
            &token,
            json!({"title": "Groceries", "content": "milk", "tags": ["shopping", "home"]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tag_names(&note_a), vec!["home", "shopping"]);

    let (_, note_b) = server
        .post("/api/notes", &token, json!({"title": "Hardware", "tags": ["shopping"]}))
        .await;

    let (status, tags) = server.get("/api/tags", &token).await;
    assert_eq!(status, StatusCode::OK);
    let tags = tags.as_array().unwrap().clone();
    assert_eq!(tags.len(), 2);
    let home = tags.iter().find(|t| t["name"] == "home").unwrap();
    let shopping = tags.iter().find(|t| t["name"] == "shopping").unwrap();
    assert_eq!(shopping["note_count"], 2);
    let home_id = home["id"].as_str().unwrap().to_string();
    let shopping_id = shopping["id"].as_str().unwrap().to_string();

    // Superset filter: both tags only matches note A
    let (_, both) = server
        .get(
            &format!("/api/notes?tags={},{}", home_id, shopping_id),
            &token,
        )
        .await;
    let both = both.as_array().unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0]["id"], note_a["id"]);

    let (_, one) = server
        .get(&format!("/api/notes?tags[]={}", shopping_id), &token)
        .await;
    assert_eq!(one.as_array().unwrap().len(), 2);

    let (status, _) = server.get("/api/notes?tags=garbage", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Tag rename conflict
    let (status, _) = server
        .put(&format!("/api/tags/{}", home_id), &token, json!({"name": "shopping"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Update replaces tags and clears content
    let note_a_id = note_a["id"].as_str().unwrap();
    let (status, updated) = server
        .put(
            &format!("/api/notes/{}", note_a_id),
            &token,
            json!({"content": null, "tags": ["errands"]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Groceries");
    assert!(updated["content"].is_null());
    assert_eq!(tag_names(&updated), vec!["errands"]);

    // Tag set endpoints
    let tags_path = format!("/api/notes/{}/tags", note_a_id);
    let (status, replaced) = server
        .put(&tags_path, &token, json!({"tags": ["zeta", " alpha ", "zeta"]}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = replaced
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
    let (status, listed) = server.get(&tags_path, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, replaced);

    // Archive hides the note from the default listing
    let (_, archived) = server
        .patch(&format!("/api/notes/{}/archive", note_a_id), &token)
        .await;
    assert_eq!(archived["is_archived"], true);
    let (_, active) = server.get("/api/notes", &token).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["id"], note_b["id"]);
    let (_, archived_list) = server.get("/api/notes?archived=true", &token).await;
    assert_eq!(archived_list.as_array().unwrap().len(), 1);

    // Deleting a tag detaches it
    let (status, body) = server
        .delete(&format!("/api/tags/{}", shopping_id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    let (_, note_b) = server
        .get(&format!("/api/notes/{}", note_b["id"].as_str().unwrap()), &token)
        .await;
    assert!(tag_names(&note_b).is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with migrated database"]
async fn test_tasks_flow() {
    let server = TestServer::start().await;
    let token = server.register().await;

    let (_, note) = server
        .post("/api/notes", &token, json!({"title": "Trip"}))
        .await;
    let note_id = note["id"].as_str().unwrap().to_string();

    let today = chrono::Local::now().format("%Y-%m-%dT12:00").to_string();
    let (status, task) = server
        .post(
            "/api/tasks",
            &token,
            json!({"title": "Book hotel", "dueDate": today, "priority": "high", "noteId": note_id}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["priority"], "high");
    assert_eq!(task["note_title"], "Trip");
    assert_eq!(task["recurring_type"], "none");
    assert_eq!(task["recurring_interval"], 1);

    let (status, _) = server
        .post("/api/tasks", &token, json!({"title": "Pack", "priority": "urgent"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post("/api/tasks", &token, json!({"title": "Pack", "dueDate": "garbage"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, undated) = server
        .post("/api/tasks", &token, json!({"title": "Someday"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, today_tasks) = server.get("/api/tasks?filter=today", &token).await;
    let today_tasks = today_tasks.as_array().unwrap();
    assert_eq!(today_tasks.len(), 1);
    assert_eq!(today_tasks[0]["id"], task["id"]);

    let (_, stats) = server.get("/api/tasks/stats", &token).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["due_today"], 1);
    assert_eq!(stats["overdue"], 0);
    assert_eq!(stats["completed"], 0);

    let (_, by_note) = server
        .get(&format!("/api/tasks/by-note/{}", note_id), &token)
        .await;
    assert_eq!(by_note.as_array().unwrap().len(), 1);

    let task_id = task["id"].as_str().unwrap().to_string();
    let (_, toggled) = server
        .patch(&format!("/api/tasks/{}/toggle", task_id), &token)
        .await;
    assert_eq!(toggled["completed"], true);
    assert!(toggled["due_date"].is_string());

    let (_, stats) = server.get("/api/tasks/stats", &token).await;
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["due_today"], 0);

    // Clearing fields through a partial update
    let (status, updated) = server
        .put(
            &format!("/api/tasks/{}", task_id),
            &token,
            json!({"dueDate": null, "note_id": null}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["due_date"].is_null());
    assert!(updated["note_id"].is_null());
    assert_eq!(updated["title"], "Book hotel");

    let (status, _) = server
        .put(&format!("/api/tasks/{}", task_id), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .delete(
            &format!("/api/tasks/{}", undated["id"].as_str().unwrap()),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, all) = server.get("/api/tasks", &token).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with migrated database"]
async fn test_other_users_rows_are_not_found() {
    let server = TestServer::start().await;
    let alice = server.register().await;
    let bob = server.register().await;

    let (_, note) = server
        .post("/api/notes", &alice, json!({"title": "Private", "tags": ["secret"]}))
        .await;
    let note_id = note["id"].as_str().unwrap().to_string();
    let tag_id = note["tags"][0]["id"].as_str().unwrap().to_string();
    let (_, task) = server
        .post("/api/tasks", &alice, json!({"title": "Hidden"}))
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, body) = server.get(&format!("/api/notes/{}", note_id), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = server.delete(&format!("/api/notes/{}", note_id), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server.get(&format!("/api/tasks/{}", task_id), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server
        .put(&format!("/api/tags/{}", tag_id), &bob, json!({"color": "#000000"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server
        .get(&format!("/api/tasks/by-note/{}", note_id), &bob)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server
        .post("/api/tasks", &bob, json!({"title": "Sneaky", "noteId": note_id}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server
        .get(&format!("/api/notes/{}/tags", note_id), &bob)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server
        .put(&format!("/api/notes/{}/tags", note_id), &bob, json!({"tags": ["mine"]}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, bob_tags) = server.get("/api/tags", &bob).await;
    assert!(bob_tags.as_array().unwrap().is_empty());

    // Alice still sees everything
    let (status, _) = server.get(&format!("/api/notes/{}", note_id), &alice).await;
    assert_eq!(status, StatusCode::OK);
}
