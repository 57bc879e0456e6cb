use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use visitlog_common::{Error, FileInfo, NewVisit, PurgedVisit, Result, Visit};
use visitlog_db::{InMemoryVisitStore, SqliteVisitStore, VisitStore};
use visitlog_gateway::router::build_router;
use visitlog_gateway::state::AppState;

/// Serve the router on a random local port and return its base URL.
async fn start_test_gateway(store: Arc<dyn VisitStore>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to random port");
    let addr = listener.local_addr().expect("listener has an address");
    let app = build_router(Arc::new(AppState::new(store)));

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}

async fn post_visit(client: &reqwest::Client, base: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{base}/visit"))
        .json(&body)
        .send()
        .await
        .expect("request should reach the gateway")
}

async fn cleanup(client: &reqwest::Client, url: String) -> (u16, Value) {
    let resp = client
        .delete(url)
        .send()
        .await
        .expect("request should reach the gateway");
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.expect("body should be json");
    (status, body)
}

fn visit_body(filepath: &str, entry: i64, exit: i64) -> Value {
    json!({
        "entry": entry,
        "exit": exit,
        "keystrokes": 12,
        "filepath": filepath,
        "filetype": "rust",
        "projectname": "visitlog",
    })
}

/// Store whose every operation fails the way a locked database would.
struct LockedStore;

#[async_trait]
impl VisitStore for LockedStore {
    async fn find_file_info(&self, _filepath: &str) -> Result<Option<FileInfo>> {
        Err(Error::Database("database is locked".into()))
    }

    async fn record_visit(&self, _visit: NewVisit) -> Result<()> {
        Err(Error::Database("database is locked".into()))
    }

    async fn purge_visits_longer_than(&self, _threshold_secs: f64) -> Result<Vec<PurgedVisit>> {
        Err(Error::Database("database is locked".into()))
    }

    async fn list_visits(&self) -> Result<Vec<Visit>> {
        Err(Error::Database("database is locked".into()))
    }

    async fn list_file_infos(&self) -> Result<Vec<FileInfo>> {
        Err(Error::Database("database is locked".into()))
    }
}

#[tokio::test]
async fn status_reports_alive() {
    let base = start_test_gateway(Arc::new(InMemoryVisitStore::new())).await;

    let body = reqwest::get(format!("{base}/status"))
        .await
        .expect("request should reach the gateway")
        .json::<Value>()
        .await
        .expect("body should be json");

    assert_eq!(body, json!({ "status": "ok", "alive": true }));
}

#[tokio::test]
async fn first_visit_creates_file_info() {
    let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    let resp = post_visit(&client, &base, visit_body("/src/main.rs", 1_000, 1_060)).await;
    assert_eq!(resp.status(), 200);
    let body = resp.json::<Value>().await.expect("body should be json");
    assert_eq!(body, json!({ "message": "Visit created successfully" }));

    let info = store
        .find_file_info("/src/main.rs")
        .await
        .expect("lookup should succeed")
        .expect("file info should exist");
    assert_eq!(info.filetype.as_deref(), Some("rust"));
    assert_eq!(info.projectname.as_deref(), Some("visitlog"));
    assert_eq!(info.lastmodification, 1_060);
}

#[tokio::test]
async fn repeat_visit_updates_only_lastmodification() {
    let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    post_visit(&client, &base, visit_body("/README.md", 0, 30)).await;
    let resp = post_visit(
        &client,
        &base,
        json!({
            "entry": 100,
            "exit": 170,
            "keystrokes": 3,
            "filepath": "/README.md",
            "filetype": "markdown",
            "projectname": "other",
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let infos = store.list_file_infos().await.expect("list should succeed");
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].filetype.as_deref(), Some("rust"));
    assert_eq!(infos[0].projectname.as_deref(), Some("visitlog"));
    assert_eq!(infos[0].lastmodification, 170);
}

#[tokio::test]
async fn visit_log_keeps_every_request() {
    let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    let requests = [("/a", 1, 2), ("/b", 3, 9), ("/a", 10, 40), ("/c", 50, 51)];
    for (path, entry, exit) in requests {
        let resp = post_visit(&client, &base, visit_body(path, entry, exit)).await;
        assert_eq!(resp.status(), 200);
    }

    let visits = store.list_visits().await.expect("list should succeed");
    assert_eq!(visits.len(), requests.len());
    for (visit, (path, entry, exit)) in visits.iter().zip(requests) {
        assert_eq!(visit.filepath, path);
        assert_eq!(visit.entry, entry);
        assert_eq!(visit.exit, exit);
        assert_eq!(visit.keystrokes, 12);
    }
    assert_eq!(store.list_file_infos().await.expect("list").len(), 3);
}

#[tokio::test]
async fn optional_fields_may_be_absent_or_null() {
    let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    let resp = post_visit(
        &client,
        &base,
        json!({ "entry": 1, "exit": 2, "keystrokes": 0, "filepath": "/bare" }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = post_visit(
        &client,
        &base,
        json!({
            "entry": 1,
            "exit": 2,
            "keystrokes": 0,
            "filepath": "/nulls",
            "filetype": null,
            "projectname": null,
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let infos = store.list_file_infos().await.expect("list should succeed");
    assert_eq!(infos.len(), 2);
    assert!(infos.iter().all(|f| f.filetype.is_none() && f.projectname.is_none()));
}

#[tokio::test]
async fn full_range_timestamps_are_recorded_and_purged() {
    let store = Arc::new(InMemoryVisitStore::new());
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    let resp = post_visit(&client, &base, visit_body("/wide", i64::MIN, i64::MAX)).await;
    assert_eq!(resp.status(), 200);
    let resp = post_visit(&client, &base, visit_body("/reversed", i64::MAX, i64::MIN)).await;
    assert_eq!(resp.status(), 200);

    let (status, body) = cleanup(&client, format!("{base}/cleanup?threshold_in_min=10")).await;
    assert_eq!(status, 200);
    assert_eq!(
        body["entries"],
        json!([{ "filepath": "/wide", "entry": i64::MIN, "exit": i64::MAX }])
    );

    // the store is still usable after the purge
    let resp = post_visit(&client, &base, visit_body("/after", 0, 1)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(store.list_visits().await.expect("list").len(), 2);
}

#[tokio::test]
async fn malformed_visit_is_rejected_before_storage() {
    let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    let missing_exit = post_visit(
        &client,
        &base,
        json!({ "entry": 1, "keystrokes": 0, "filepath": "/x" }),
    )
    .await;
    assert_eq!(missing_exit.status(), 422);
    let body = missing_exit.json::<Value>().await.expect("body should be json");
    assert!(body["detail"].is_string());

    let wrong_type = post_visit(
        &client,
        &base,
        json!({ "entry": "soon", "exit": 2, "keystrokes": 0, "filepath": "/x" }),
    )
    .await;
    assert_eq!(wrong_type.status(), 422);

    assert!(store.list_visits().await.expect("list").is_empty());
    assert!(store.list_file_infos().await.expect("list").is_empty());
}

#[tokio::test]
async fn cleanup_purges_by_duration() {
    let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    post_visit(&client, &base, visit_body("/ten", 0, 10)).await;
    post_visit(&client, &base, visit_body("/huge", 5, 100_005)).await;
    post_visit(&client, &base, visit_body("/fifty", 0, 50)).await;

    let (status, body) = cleanup(&client, format!("{base}/cleanup?threshold_in_min=10")).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "message": "Visit deleted successfully",
            "entries": [{ "filepath": "/huge", "entry": 5, "exit": 100_005 }],
        })
    );

    let remaining: Vec<String> = store
        .list_visits()
        .await
        .expect("list should succeed")
        .into_iter()
        .map(|v| v.filepath)
        .collect();
    assert_eq!(remaining, vec!["/ten", "/fifty"]);
}

#[tokio::test]
async fn cleanup_twice_reports_nothing_to_delete() {
    let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    post_visit(&client, &base, visit_body("/short", 0, 10)).await;
    post_visit(&client, &base, visit_body("/long", 0, 5_000)).await;

    let url = format!("{base}/cleanup?threshold_in_min=1.5");
    let (_, first) = cleanup(&client, url.clone()).await;
    assert_eq!(first["entries"].as_array().map(Vec::len), Some(1));

    let (status, second) = cleanup(&client, url).await;
    assert_eq!(status, 200);
    assert_eq!(second, json!({ "message": "No entries to delete" }));
    assert!(second.get("entries").is_none());
    assert_eq!(store.list_visits().await.expect("list").len(), 1);
}

#[tokio::test]
async fn cleanup_defaults_to_one_day() {
    let client = reqwest::Client::new();
    let day = 24 * 60 * 60;
    let mut responses = Vec::new();

    for query in ["", "?threshold_in_min=1440"] {
        let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
        let base = start_test_gateway(store.clone()).await;

        post_visit(&client, &base, visit_body("/exactly-a-day", 0, day)).await;
        post_visit(&client, &base, visit_body("/over-a-day", 0, day + 1)).await;

        let (status, body) = cleanup(&client, format!("{base}/cleanup{query}")).await;
        assert_eq!(status, 200);
        assert_eq!(store.list_visits().await.expect("list").len(), 1);
        responses.push(body);
    }

    assert_eq!(responses[0], responses[1]);
    assert_eq!(responses[0]["entries"][0]["filepath"], "/over-a-day");
}

#[tokio::test]
async fn cleanup_rejects_non_numeric_threshold() {
    let base = start_test_gateway(Arc::new(InMemoryVisitStore::new())).await;
    let client = reqwest::Client::new();

    let (status, body) = cleanup(&client, format!("{base}/cleanup?threshold_in_min=soon")).await;
    assert_eq!(status, 400);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn concurrent_visits_keep_one_file_info_per_path() {
    let store = Arc::new(SqliteVisitStore::in_memory().expect("in-memory store"));
    let base = start_test_gateway(store.clone()).await;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let base = base.clone();
        handles.push(tokio::spawn(async move {
            post_visit(&client, &base, visit_body("/shared.rs", i, i + 1))
                .await
                .status()
                .as_u16()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.expect("task should not panic"), 200);
    }

    assert_eq!(store.list_visits().await.expect("list").len(), 20);
    let infos = store.list_file_infos().await.expect("list should succeed");
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].filepath, "/shared.rs");
}

#[tokio::test]
async fn store_errors_surface_as_500_with_detail() {
    let base = start_test_gateway(Arc::new(LockedStore)).await;
    let client = reqwest::Client::new();

    let resp = post_visit(&client, &base, visit_body("/locked", 0, 1)).await;
    assert_eq!(resp.status(), 500);
    let body = resp.json::<Value>().await.expect("body should be json");
    assert!(
        body["detail"]
            .as_str()
            .is_some_and(|d| d.contains("database is locked"))
    );

    let (status, body) = cleanup(&client, format!("{base}/cleanup")).await;
    assert_eq!(status, 500);
    assert!(body["detail"].is_string());
}
