use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::utils::error::CustomError;

/// Sub-directory (and locator prefix) images are written to
pub const IMAGE_DIR: &str = "images";

// ============================================
// File Upload & Validation Structs
// ============================================

/// Represents a file received in a multipart form
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

impl FileUpload {
    pub fn new(file_name: String, data: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            file_name,
            data,
            content_type,
        }
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Lower-cased extension, if the name has one
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// File validation configuration
#[derive(Debug, Clone)]
pub struct FileValidator {
    /// Allowed file extensions (e.g., ["jpg", "png"])
    pub allowed_extensions: Vec<String>,
    /// Allowed MIME types, checked when the client sends one
    pub allowed_content_types: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: usize,
}

impl FileValidator {
    /// Validator for post images: png/jpg/jpeg, max 10MB
    pub fn images() -> Self {
        Self {
            allowed_extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
            allowed_content_types: vec![
                "image/png".to_string(),
                "image/jpg".to_string(),
                "image/jpeg".to_string(),
            ],
            max_file_size: 10 * 1024 * 1024,
        }
    }

    #[cfg(test)]
    pub fn with_max_size(mut self, size_bytes: usize) -> Self {
        self.max_file_size = size_bytes;
        self
    }

    pub fn validate(&self, file: &FileUpload) -> Result<(), String> {
        if file.data.is_empty() {
            return Err("File is empty".to_string());
        }

        let extension = file.extension().ok_or("File has no extension")?;
        if !self.allowed_extensions.contains(&extension) {
            return Err(format!(
                "Invalid file type '{}'. Allowed types: {}",
                extension,
                self.allowed_extensions.join(", ")
            ));
        }

        if let Some(ct) = &file.content_type {
            let ct = ct.to_lowercase();
            if ct != "application/octet-stream" && !self.allowed_content_types.contains(&ct) {
                return Err(format!("Invalid content type '{}'", ct));
            }
        }

        if file.size() > self.max_file_size {
            return Err(format!(
                "File too large. Maximum size: {} bytes, file size: {} bytes",
                self.max_file_size,
                file.size()
            ));
        }

        Ok(())
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::images()
    }
}

// ============================================
// Image storage on local disk
// ============================================

/// Stores post images below `base_dir/images` and hands out
/// `images/<file>` locators.
#[derive(Debug, Clone)]
pub struct ImageStore {
    base_dir: PathBuf,
}

impl ImageStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Write the upload to disk and return its locator
    pub async fn save(&self, file: &FileUpload) -> Result<String, CustomError> {
        let dir = self.base_dir.join(IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let stored_name = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(&file.file_name));
        tokio::fs::write(dir.join(&stored_name), &file.data).await?;

        let locator = format!("{}/{}", IMAGE_DIR, stored_name);
        log::debug!("Stored image {} ({} bytes)", locator, file.size());
        Ok(locator)
    }

    /// Map an `images/<file>` locator onto the disk. Anything else,
    /// including nested paths, is refused.
    pub fn resolve(&self, locator: &str) -> Option<PathBuf> {
        let mut components = Path::new(locator).components();
        match (components.next(), components.next(), components.next()) {
            (Some(Component::Normal(dir)), Some(Component::Normal(file)), None)
                if dir == IMAGE_DIR =>
            {
                Some(self.base_dir.join(IMAGE_DIR).join(file))
            }
            _ => None,
        }
    }

    /// Best-effort delete. Failures are logged and never surfaced.
    pub async fn remove(&self, locator: &str) {
        let Some(path) = self.resolve(locator) else {
            log::warn!("Refusing to delete non-image locator: {}", locator);
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => log::debug!("Deleted image {}", locator),
            Err(e) => log::warn!("Failed to delete image {}: {}", locator, e),
        }
    }

    /// Whether `locator` names a stored image file
    pub async fn contains(&self, locator: &str) -> bool {
        match self.resolve(locator) {
            Some(path) => tokio::fs::metadata(path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false),
            None => false,
        }
    }
}

/// Keep only characters that are safe in a file name
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> FileUpload {
        FileUpload::new(name.to_string(), vec![0x89, 0x50, 0x4e, 0x47], Some("image/png".into()))
    }

    #[test]
    fn accepts_post_image_types() {
        let validator = FileValidator::images();
        assert!(validator.validate(&png("cat.png")).is_ok());
        assert!(validator.validate(&png("CAT.JPG")).is_ok());

        let gif = FileUpload::new("cat.gif".into(), vec![1, 2, 3], Some("image/gif".into()));
        assert!(validator.validate(&gif).is_err());

        let no_ext = FileUpload::new("cat".into(), vec![1, 2, 3], None);
        assert!(validator.validate(&no_ext).is_err());

        let empty = FileUpload::new("cat.png".into(), vec![], None);
        assert!(validator.validate(&empty).is_err());
    }

    #[test]
    fn rejects_oversized_files() {
        let validator = FileValidator::images().with_max_size(2);
        assert!(validator.validate(&png("cat.png")).is_err());
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my cat (1).png"), "my_cat__1_.png");
        assert_eq!(sanitize_file_name(".."), "image");
    }

    #[test]
    fn resolve_stays_under_root() {
        let store = ImageStore::new("/srv/feed");
        assert_eq!(
            store.resolve("images/a.png"),
            Some(PathBuf::from("/srv/feed/images/a.png"))
        );
        assert_eq!(store.resolve("../secret.png"), None);
        assert_eq!(store.resolve("/etc/passwd"), None);
        assert_eq!(store.resolve(""), None);
    }

    #[test]
    fn resolve_only_maps_files_directly_in_the_image_dir() {
        let store = ImageStore::new("/srv/feed");
        assert_eq!(store.resolve("Cargo.toml"), None);
        assert_eq!(store.resolve(".env"), None);
        assert_eq!(store.resolve("images"), None);
        assert_eq!(store.resolve("images/nested/a.png"), None);
        assert_eq!(store.resolve("./images/a.png"), None);
        assert_eq!(store.resolve("images/../Cargo.toml"), None);
        assert_eq!(store.resolve("other/a.png"), None);
    }

    #[actix_web::test]
    async fn remove_leaves_files_outside_the_image_dir() {
        let root = tempfile::tempdir().unwrap();
        let manifest = root.path().join("Cargo.toml");
        std::fs::write(&manifest, "[package]").unwrap();
        let store = ImageStore::new(root.path());

        store.remove("Cargo.toml").await;
        assert!(manifest.exists());
        assert!(!store.contains("Cargo.toml").await);
    }

    #[actix_web::test]
    async fn save_then_remove() {
        let root = tempfile::tempdir().unwrap();
        let store = ImageStore::new(root.path());

        let locator = store.save(&png("cat.png")).await.unwrap();
        assert!(locator.starts_with("images/"));
        assert!(locator.ends_with("-cat.png"));
        assert!(store.contains(&locator).await);

        store.remove(&locator).await;
        assert!(!store.contains(&locator).await);

        // second delete only logs
        store.remove(&locator).await;
    }
}
