#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use feed_backend::feed::notifier::NotificationSink;
use feed_backend::post::memory_store::InMemoryPostStore;
use feed_backend::post::post_service::PostService;
use feed_backend::post::post_store::PostStore;
use feed_backend::user::model::User;
use feed_backend::utils::uploads::{FileUpload, ImageStore};
use tempfile::TempDir;

pub const BOUNDARY: &str = "----feedtestboundary";

/// Remembers every published event
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, event: &str, payload: serde_json::Value) {
        self.events.lock().unwrap().push((event.to_string(), payload));
    }
}

pub struct TestContext {
    pub store: Arc<InMemoryPostStore>,
    pub sink: Arc<RecordingSink>,
    pub images: ImageStore,
    pub service: PostService,
    pub owner: User,
    pub stranger: User,
    // dropped last so the image root outlives the service
    pub root: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryPostStore::new());
        Self::with_store(store.clone(), store).await
    }

    /// Wire the service against `service_store`, seeding users into `store`
    pub async fn with_store(store: Arc<InMemoryPostStore>, service_store: Arc<dyn PostStore>) -> Self {
        let root = tempfile::tempdir().expect("temp image root");
        let images = ImageStore::new(root.path());
        let sink = Arc::new(RecordingSink::default());

        let owner = User::new("Ada", "ada@example.com");
        let stranger = User::new("Grace", "grace@example.com");
        store.insert_user(owner.clone()).await;
        store.insert_user(stranger.clone()).await;

        let service = PostService::new(service_store, images.clone(), sink.clone());

        Self {
            store,
            sink,
            images,
            service,
            owner,
            stranger,
            root,
        }
    }

    /// Number of files currently in the image directory
    pub fn stored_image_count(&self) -> usize {
        std::fs::read_dir(self.root.path().join("images"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn png(name: &str) -> FileUpload {
    FileUpload::new(
        name.to_string(),
        vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a],
        Some("image/png".to_string()),
    )
}

/// A multipart part: text field or file
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
