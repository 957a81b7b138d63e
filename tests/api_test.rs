use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt; // for `oneshot`

use artifact_unzip::api::{self, AppState};
use artifact_unzip::jobs::UnzipJob;
use artifact_unzip::observability::Metrics;
use artifact_unzip::queue::{FailedJobs, RetryPolicy, TaskBroker};
use artifact_unzip::store::{ARCHIVE_NAME, InMemoryStore};
use artifact_unzip::worker::{Registration, WorkerConfig, WorkerPool};

const TOKEN: &str = "dummytoken";

struct TestApp {
    app: Router,
    store: Arc<InMemoryStore>,
    pool: Arc<WorkerPool>,
    shutdown: watch::Sender<bool>,
}

impl TestApp {
    /// Router over a pool whose job talks to an in-memory store
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let job = UnzipJob::new(store.clone());
        let retry = RetryPolicy::fixed(3, Duration::from_millis(10));

        let broker = Arc::new(TaskBroker::new("unzip"));
        let metrics = Arc::new(Metrics::new());
        let failed = Arc::new(FailedJobs::default());
        let config = WorkerConfig {
            min_task_processors: 1,
            max_task_processors: 2,
            check_timeout: Duration::from_millis(20),
            max_event_loop_delay: Duration::from_secs(5),
        };
        let pool = Arc::new(WorkerPool::new(
            config,
            broker.clone(),
            Registration::new(Arc::new(job), retry),
            metrics.clone(),
            failed.clone(),
        ));

        let (shutdown, _) = watch::channel(false);
        let state = AppState::new(broker, pool.clone(), metrics, failed);

        Self {
            app: api::router(state),
            store,
            pool,
            shutdown,
        }
    }

    fn start_pool(&self) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let rx = self.shutdown.subscribe();
        tokio::spawn(async move { pool.run(rx).await })
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in files {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Helper to build a POST /jobs/unzip request
fn post_unzip_request(body: String) -> Request<Body> {
    Request::builder()
        .uri("/jobs/unzip")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn wait_until<F, Fut>(mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_enqueue_unzip_accepted() {
    let app = TestApp::new();

    let body = json!({ "buildId": 1234, "token": TOKEN }).to_string();
    let (status, json) = app.send(post_unzip_request(body)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["seq"], 0);
    assert_eq!(json["queue"], "unzip");

    let (_, status_json) = app.get("/status").await;
    assert_eq!(status_json["depth"], 1);
}

#[tokio::test]
async fn test_enqueue_unzip_rejects_bad_payloads() {
    let app = TestApp::new();

    let cases = [
        "not json".to_string(),
        json!({ "token": TOKEN }).to_string(),
        json!({ "buildId": 0, "token": TOKEN }).to_string(),
        json!({ "buildId": 1234, "token": "" }).to_string(),
        json!({ "buildId": -1, "token": TOKEN }).to_string(),
    ];

    for body in cases {
        let (status, json) = app.send(post_unzip_request(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(json["code"], "INVALID_PAYLOAD");
    }

    let (_, status_json) = app.get("/status").await;
    assert_eq!(status_json["depth"], 0);
}

#[tokio::test]
async fn test_health_reflects_pool_state() {
    let app = TestApp::new();

    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["components"]["worker_pool"], "unhealthy");

    let handle = app.start_pool();
    wait_until(|| async { app.pool.processor_count() > 0 }).await;

    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");

    app.shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_enqueued_job_reuploads_archive() {
    let app = TestApp::new();
    app.store.insert(
        1234,
        ARCHIVE_NAME,
        build_zip(&[
            ("test-artifact1.txt", b"test artifact 1"),
            ("test-artifact2.txt", b"test artifact 2"),
        ]),
    );
    let handle = app.start_pool();

    let body = json!({ "buildId": 1234, "token": TOKEN }).to_string();
    let (status, _) = app.send(post_unzip_request(body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    wait_until(|| async {
        let (_, json) = app.get("/status").await;
        json["metrics"]["jobs_succeeded"] == 1
    })
    .await;

    assert_eq!(
        app.store.get(1234, "test-artifact1.txt").unwrap().as_ref(),
        b"test artifact 1"
    );
    assert_eq!(
        app.store.get(1234, "test-artifact2.txt").unwrap().as_ref(),
        b"test artifact 2"
    );

    app.shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_exhausted_job_listed_without_token() {
    // No archive stored for the build, every attempt fails to fetch
    let app = TestApp::new();
    let handle = app.start_pool();

    let body = json!({ "buildId": 99, "token": TOKEN }).to_string();
    app.send(post_unzip_request(body)).await;

    wait_until(|| async {
        let (_, json) = app.get("/status").await;
        json["metrics"]["jobs_failed"] == 1
    })
    .await;

    let (_, json) = app.get("/status").await;
    let failed = &json["failed"][0];
    assert_eq!(failed["build_id"], 99);
    assert_eq!(failed["attempts"], 3);
    assert_eq!(failed["error_kind"], "fetch");
    assert_eq!(json["metrics"]["jobs_re_enqueued"], 2);
    assert!(!json.to_string().contains(TOKEN));

    app.shutdown.send(true).unwrap();
    handle.await.unwrap();
}
