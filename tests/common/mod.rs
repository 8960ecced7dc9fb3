#![allow(dead_code)]

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use file_translator_backend::config::Config;
use file_translator_backend::startup::Application;
use reqwest::multipart;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;

/// In-process stand-in for the extraction and translation services.
#[derive(Clone, Default)]
pub struct FakeServices {
    /// File names seen by the partition endpoint, in arrival order.
    pub partitioned: Arc<Mutex<Vec<String>>>,
    /// API keys sent with partition requests.
    pub api_keys: Arc<Mutex<Vec<Option<String>>>>,
    /// Statuses returned (one per request) before partitioning succeeds.
    pub partition_failures: Arc<Mutex<VecDeque<StatusCode>>>,
    /// When set, partition requests are accepted but never answered.
    pub partition_hangs: Arc<AtomicBool>,
    pub translated: Arc<Mutex<Vec<String>>>,
}

impl FakeServices {
    pub fn fail_partition_with(&self, statuses: &[StatusCode]) {
        self.partition_failures
            .lock()
            .unwrap()
            .extend(statuses.iter().copied());
    }

    pub fn hang_partitions(&self) {
        self.partition_hangs.store(true, Ordering::SeqCst);
    }

    pub fn partitioned(&self) -> Vec<String> {
        self.partitioned.lock().unwrap().clone()
    }

    pub fn api_keys(&self) -> Vec<Option<String>> {
        self.api_keys.lock().unwrap().clone()
    }
}

async fn partition(
    State(fake): State<FakeServices>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if fake.partition_hangs.load(Ordering::SeqCst) {
        std::future::pending::<()>().await;
    }

    fake.api_keys.lock().unwrap().push(
        headers
            .get("unstructured-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );

    let mut elements = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("files") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let text = String::from_utf8_lossy(&field.bytes().await.unwrap()).into_owned();
        fake.partitioned.lock().unwrap().push(filename.clone());
        if text.trim().is_empty() {
            continue;
        }
        elements.push(json!({
            "type": "NarrativeText",
            "element_id": Uuid::new_v4().simple().to_string(),
            "text": text,
            "metadata": { "filename": filename, "languages": ["eng"] }
        }));
    }

    let failure = fake.partition_failures.lock().unwrap().pop_front();
    match failure {
        Some(status) => (status, "partition failed").into_response(),
        None => Json(Value::Array(elements)).into_response(),
    }
}

async fn translate(State(fake): State<FakeServices>, Json(body): Json<Value>) -> Json<Value> {
    let text = body["text"].as_str().unwrap_or_default();
    let target = body["target_lang"].as_str().unwrap_or_default();
    fake.translated.lock().unwrap().push(text.to_string());
    Json(json!({
        "translated_text": format!("[{}] {}", target, text),
        "success": true
    }))
}

pub async fn spawn_fake_services() -> (String, FakeServices) {
    let fake = FakeServices::default();
    let router = Router::new()
        .route("/general/v0/general", post(partition))
        .route("/translate", post(translate))
        .with_state(fake.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (address, fake)
}

pub struct TestApp {
    pub address: String,
    pub config: Config,
    pub fake: FakeServices,
    pub base_dir: PathBuf,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut Config)) -> Self {
        let (fake_address, fake) = spawn_fake_services().await;
        let base_dir = PathBuf::from(format!("target/test-app-{}", Uuid::new_v4()));

        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0; // Random port for testing
        config.upload.root_directory = base_dir.join("uploads").display().to_string();
        config.translation.output_directory =
            base_dir.join("translations").display().to_string();
        config.translation.service_url = Some(fake_address.clone());
        config.extraction.api_url = fake_address;
        config.extraction.timeout_secs = 5;
        config.extraction.initial_backoff_ms = 10;
        customize(&mut config);

        let app = Application::build(config.clone())
            .await
            .expect("Failed to build test application");
        let address = format!("http://127.0.0.1:{}", app.port());
        tokio::spawn(app.run_until_stopped());

        TestApp {
            address,
            config,
            fake,
            base_dir,
            client: reqwest::Client::new(),
        }
    }

    pub fn upload_root(&self) -> PathBuf {
        PathBuf::from(&self.config.upload.root_directory)
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.upload_root().join(session_id)
    }

    /// Number of session directories under the upload root.
    pub fn session_count(&self) -> usize {
        std::fs::read_dir(self.upload_root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn upload(&self, files: &[(&str, &str)]) -> reqwest::Response {
        // Send names verbatim so traversal attempts reach the server unencoded
        let mut form = multipart::Form::new().percent_encode_noop();
        for (name, content) in files {
            form = form.part(
                "files",
                multipart::Part::bytes(content.as_bytes().to_vec()).file_name(name.to_string()),
            );
        }
        self.client
            .post(format!("{}/upload", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Upload files and return the new session id.
    pub async fn create_session(&self, files: &[(&str, &str)]) -> String {
        let response = self.upload(files).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        body["sessionId"].as_str().unwrap().to_string()
    }

    pub async fn translate(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/translate", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.base_dir).await;
    }
}
