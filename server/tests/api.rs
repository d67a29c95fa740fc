use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum::{
    http::{self, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use todo_server::{app, AppState, Todo};
use todo_store::{
    CollectionPath, Document, DocumentPath, DocumentStore, Fields, MemoryStore, StoreError,
};
use tower::ServiceExt;

const OWNER: &str = "u1";

/// Wraps a store and counts every call that reaches it.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        self.hit();
        self.inner.list(collection).await
    }

    async fn get(&self, document: &DocumentPath) -> Result<Option<Document>, StoreError> {
        self.hit();
        self.inner.get(document).await
    }

    async fn insert(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        self.hit();
        self.inner.insert(collection, fields).await
    }

    async fn merge_update(
        &self,
        document: &DocumentPath,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.hit();
        self.inner.merge_update(document, fields).await
    }

    async fn delete(&self, document: &DocumentPath) -> Result<(), StoreError> {
        self.hit();
        self.inner.delete(document).await
    }
}

/// A store whose backend is unreachable.
struct DownStore;

const DOWN_DETAIL: &str = "connect error: 10.0.0.7:443 refused";

#[async_trait]
impl DocumentStore for DownStore {
    async fn list(&self, _: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Transport(DOWN_DETAIL.to_string()))
    }

    async fn get(&self, _: &DocumentPath) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Transport(DOWN_DETAIL.to_string()))
    }

    async fn insert(&self, _: &CollectionPath, _: Fields) -> Result<Document, StoreError> {
        Err(StoreError::Transport(DOWN_DETAIL.to_string()))
    }

    async fn merge_update(&self, _: &DocumentPath, _: Fields) -> Result<(), StoreError> {
        Err(StoreError::Status {
            status: 403,
            message: "Missing or insufficient permissions.".to_string(),
        })
    }

    async fn delete(&self, _: &DocumentPath) -> Result<(), StoreError> {
        Err(StoreError::Transport(DOWN_DETAIL.to_string()))
    }
}

fn memory_app() -> Router {
    app(AppState::with_store(Arc::new(MemoryStore::new())))
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, owner: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header("user-id", owner);
    }
    builder.body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, owner: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(owner) = owner {
        builder = builder.header("user-id", owner);
    }
    builder.body(body.to_string()).unwrap()
}

async fn create(app: &Router, owner: &str, text: &str, datetime: &str) -> Todo {
    let body = json!({"text": text, "datetime": datetime}).to_string();
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/todos", Some(owner), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- owner ---

#[tokio::test]
async fn missing_owner_is_rejected_for_every_route_without_store_calls() {
    let store = Arc::new(CountingStore::default());
    let app = app(AppState::with_store(store.clone()));

    let requests = vec![
        request("GET", "/todos", None),
        json_request("POST", "/todos", None, r#"{"text":"a","datetime":"t"}"#),
        request("GET", "/todos/abc", None),
        json_request("PUT", "/todos/abc", None, r#"{"text":"a"}"#),
        request("DELETE", "/todos/abc", None),
    ];

    for req in requests {
        let label = format!("{} {}", req.method(), req.uri());
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{label}");
        let body: Value = body_json(resp).await;
        assert_eq!(
            body,
            json!({"error": "User ID is required.", "status": 400}),
            "{label}"
        );
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn empty_owner_header_is_missing_owner() {
    let resp = memory_app()
        .oneshot(request("GET", "/todos", Some("")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_with_slash_is_bad_request() {
    let resp = memory_app()
        .oneshot(request("GET", "/todos", Some("u1/todos/x")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn utf8_owner_is_accepted() {
    let app = memory_app();
    let body = r#"{"text":"café","datetime":"2024-01-01T10:00:00Z"}"#;
    let create = Request::builder()
        .method("POST")
        .uri("/todos")
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("user-id", http::HeaderValue::from_bytes("josé".as_bytes()).unwrap())
        .body(body.to_string())
        .unwrap();
    let resp = app.clone().oneshot(create).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Todo = body_json(resp).await;

    let list = Request::builder()
        .uri("/todos")
        .header("user-id", http::HeaderValue::from_bytes("josé".as_bytes()).unwrap())
        .body(String::new())
        .unwrap();
    let resp = app.oneshot(list).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let todos: Vec<Todo> = body_json(resp).await;
    assert_eq!(todos, vec![created]);
}

#[tokio::test]
async fn owner_header_that_is_not_utf8_is_bad_request() {
    let req = Request::builder()
        .uri("/todos")
        .header("user-id", http::HeaderValue::from_bytes(&[0x6a, 0xff, 0xfe]).unwrap())
        .body(String::new())
        .unwrap();
    let resp = memory_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "Invalid user ID: header is not valid UTF-8.");
}

#[tokio::test]
async fn owner_header_name_is_configurable() {
    let state = AppState::new(
        todo_server::TodoService::new(Arc::new(MemoryStore::new())),
        http::HeaderName::from_static("x-owner"),
    );
    let app = app(state);

    let resp = app
        .clone()
        .oneshot(request("GET", "/todos", Some(OWNER)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/todos")
                .header("x-owner", OWNER)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- list ---

#[tokio::test]
async fn list_todos_empty() {
    let resp = memory_app()
        .oneshot(request("GET", "/todos", Some(OWNER)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.is_empty());
}

#[tokio::test]
async fn list_contains_every_created_id() {
    let app = memory_app();
    let mut ids = Vec::new();
    for n in 0..5 {
        let todo = create(&app, OWNER, &format!("task {n}"), "2024-01-01T10:00:00Z").await;
        ids.push(todo.id);
    }

    let resp = app
        .oneshot(request("GET", "/todos", Some(OWNER)))
        .await
        .unwrap();
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.len() >= ids.len());
    for id in &ids {
        assert!(todos.iter().any(|t| &t.id == id), "missing {id}");
    }
}

// --- create ---

#[tokio::test]
async fn create_todo_returns_201() {
    let app = memory_app();
    let todo = create(&app, OWNER, "buy milk", "2024-01-01T10:00:00Z").await;

    assert!(!todo.id.is_empty());
    assert_eq!(todo.text, "buy milk");
    assert_eq!(todo.datetime, "2024-01-01T10:00:00Z");
}

#[tokio::test]
async fn create_missing_or_empty_fields_is_400_without_mutation() {
    let store = Arc::new(CountingStore::default());
    let app = app(AppState::with_store(store.clone()));

    for body in [
        r#"{"text":"buy milk"}"#,
        r#"{"datetime":"2024-01-01T10:00:00Z"}"#,
        r#"{"text":"","datetime":"2024-01-01T10:00:00Z"}"#,
        r#"{"text":null,"datetime":"2024-01-01T10:00:00Z"}"#,
        r#"{}"#,
    ] {
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/todos", Some(OWNER), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
        let err: Value = body_json(resp).await;
        assert_eq!(err["error"], "Both 'text' and 'datetime' are required.");
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn create_malformed_json_is_400() {
    for body in ["{not json", r#"{"text":1,"datetime":"t"}"#, ""] {
        let resp = memory_app()
            .oneshot(json_request("POST", "/todos", Some(OWNER), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body:?}");
        let err: Value = body_json(resp).await;
        assert_eq!(err["status"], 400);
    }
}

// --- get ---

#[tokio::test]
async fn get_todo_not_found() {
    let resp = memory_app()
        .oneshot(request("GET", "/todos/does-not-exist", Some(OWNER)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "To-do not found.", "status": 404}));
}

#[tokio::test]
async fn todo_is_invisible_to_other_owners() {
    let app = memory_app();
    let created = create(&app, "u1", "buy milk", "2024-01-01T10:00:00Z").await;

    let resp = app
        .clone()
        .oneshot(request("GET", &format!("/todos/{}", created.id), Some("u1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Todo = body_json(resp).await;
    assert_eq!(fetched, created);

    let resp = app
        .oneshot(request("GET", &format!("/todos/{}", created.id), Some("u2")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- update ---

#[tokio::test]
async fn update_text_only_leaves_datetime() {
    let app = memory_app();
    let created = create(&app, OWNER, "buy milk", "2024-01-01T10:00:00Z").await;
    let uri = format!("/todos/{}", created.id);

    let resp = app
        .clone()
        .oneshot(json_request("PUT", &uri, Some(OWNER), r#"{"text":"buy oat milk"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "message": "To-do updated successfully.",
            "id": created.id,
            "text": "buy oat milk"
        })
    );

    let resp = app
        .oneshot(request("GET", &uri, Some(OWNER)))
        .await
        .unwrap();
    let fetched: Todo = body_json(resp).await;
    assert_eq!(fetched.text, "buy oat milk");
    assert_eq!(fetched.datetime, "2024-01-01T10:00:00Z");
}

#[tokio::test]
async fn update_both_fields_overwrites_both() {
    let app = memory_app();
    let created = create(&app, OWNER, "a", "t1").await;
    let uri = format!("/todos/{}", created.id);

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &uri,
            Some(OWNER),
            r#"{"text":"b","datetime":"t2"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request("GET", &uri, Some(OWNER)))
        .await
        .unwrap();
    let fetched: Todo = body_json(resp).await;
    assert_eq!((fetched.text.as_str(), fetched.datetime.as_str()), ("b", "t2"));
}

#[tokio::test]
async fn update_without_fields_is_400() {
    let app = memory_app();
    let created = create(&app, OWNER, "a", "t1").await;

    let resp = app
        .oneshot(json_request(
            "PUT",
            &format!("/todos/{}", created.id),
            Some(OWNER),
            r#"{"text":""}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(
        body["error"],
        "At least one of 'text' or 'datetime' must be provided."
    );
}

#[tokio::test]
async fn update_todo_not_found() {
    let resp = memory_app()
        .oneshot(json_request(
            "PUT",
            "/todos/does-not-exist",
            Some(OWNER),
            r#"{"text":"Nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_todo_returns_message() {
    let app = memory_app();
    let created = create(&app, OWNER, "a", "t1").await;

    let resp = app
        .oneshot(request("DELETE", &format!("/todos/{}", created.id), Some(OWNER)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"message": "To-do deleted successfully."}));
}

#[tokio::test]
async fn delete_todo_not_found() {
    let resp = memory_app()
        .oneshot(request("DELETE", "/todos/does-not-exist", Some(OWNER)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- store failures ---

#[tokio::test]
async fn store_failures_are_500_without_detail() {
    let app = app(AppState::with_store(Arc::new(DownStore)));

    let cases = vec![
        (request("GET", "/todos", Some(OWNER)), "Failed to fetch to-dos."),
        (
            json_request("POST", "/todos", Some(OWNER), r#"{"text":"a","datetime":"t"}"#),
            "Failed to create to-do.",
        ),
        (request("GET", "/todos/abc", Some(OWNER)), "Failed to fetch to-do."),
        (
            json_request("PUT", "/todos/abc", Some(OWNER), r#"{"text":"a"}"#),
            "Failed to update to-do.",
        ),
        (request("DELETE", "/todos/abc", Some(OWNER)), "Failed to delete to-do."),
    ];

    for (req, message) in cases {
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("10.0.0.7"), "{text}");
        assert!(!text.contains("permissions"), "{text}");
        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body, json!({"error": message, "status": 500}));
    }
}

// --- ambient ---

#[tokio::test]
async fn health_needs_no_owner() {
    let resp = memory_app()
        .oneshot(request("GET", "/health", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let resp = memory_app()
        .oneshot(
            Request::builder()
                .uri("/todos")
                .header("user-id", OWNER)
                .header(http::header::ORIGIN, "http://localhost:5173")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = memory_app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/todos",
            Some(OWNER),
            r#"{"text":"Walk dog","datetime":"2024-01-01T08:00:00Z"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Todo = body_json(resp).await;
    let id = created.id.clone();

    // list: the one todo
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", "/todos", Some(OWNER)))
        .await
        .unwrap();
    let todos: Vec<Todo> = body_json(resp).await;
    assert_eq!(todos, vec![created.clone()]);

    // update: datetime only
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/todos/{id}"),
            Some(OWNER),
            r#"{"datetime":"2024-01-01T09:00:00Z"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // get: text unchanged
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &format!("/todos/{id}"), Some(OWNER)))
        .await
        .unwrap();
    let fetched: Todo = body_json(resp).await;
    assert_eq!(fetched.text, "Walk dog");
    assert_eq!(fetched.datetime, "2024-01-01T09:00:00Z");

    // delete, then delete again
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", &format!("/todos/{id}"), Some(OWNER)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", &format!("/todos/{id}"), Some(OWNER)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list after delete: empty
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", "/todos", Some(OWNER)))
        .await
        .unwrap();
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.is_empty());
}
