use crate::utils::AppError;
use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::Rng;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_CONSTITUTION_BYTES: usize = 20 * 1024 * 1024;

lazy_static! {
    static ref DOCUMENT_MIME_TYPES: HashSet<&'static str> = [
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "image/jpeg",
        "image/png",
    ]
    .into_iter()
    .collect();
    static ref CONSTITUTION_MIME_TYPES: HashSet<&'static str> =
        ["application/pdf"].into_iter().collect();
}

/// Upload destinations, each with its own directory and filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    Documents,
    Constitutions,
}

impl StorageArea {
    pub fn directory(&self) -> &'static str {
        match self {
            StorageArea::Documents => "documents",
            StorageArea::Constitutions => "constitutions",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            StorageArea::Documents => "doc",
            StorageArea::Constitutions => "const",
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            StorageArea::Documents => MAX_DOCUMENT_BYTES,
            StorageArea::Constitutions => MAX_CONSTITUTION_BYTES,
        }
    }

    /// Key prefix for files uploaded into this area by `owner`.
    fn owner_prefix(&self, owner: &str) -> String {
        format!("{}/{}-{}-", self.directory(), self.prefix(), owner)
    }

    /// True when `key` names a file `owner` uploaded into this area.
    pub fn is_owned_key(&self, key: &str, owner: &str) -> bool {
        key.strip_prefix(&self.owner_prefix(owner))
            .is_some_and(|rest| !rest.is_empty() && !rest.contains(['/', '\\']) && !rest.starts_with('.'))
    }

    pub fn check_mime_type(&self, mime_type: &str) -> Result<(), AppError> {
        let allowed = match self {
            StorageArea::Documents => &*DOCUMENT_MIME_TYPES,
            StorageArea::Constitutions => &*CONSTITUTION_MIME_TYPES,
        };
        if allowed.contains(mime_type) {
            return Ok(());
        }
        Err(AppError::validation(match self {
            StorageArea::Documents => "Only PDF, DOC, DOCX, JPEG, and PNG files are allowed",
            StorageArea::Constitutions => "Only PDF files are allowed for constitutions",
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// Relative reference, e.g. `documents/doc-<owner>-1700000000000-42.pdf`
    pub key: String,
    pub size: i64,
}

/// A file received from a multipart upload, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// `owner` is recorded in the key; see [`StorageArea::is_owned_key`].
    async fn put(&self, area: StorageArea, owner: &str, original_name: &str, bytes: &[u8]) -> Result<StoredFile, AppError>;

    /// `None` when the file is gone.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Returns false when there was nothing to delete.
    async fn delete(&self, key: &str) -> Result<bool, AppError>;
}

/// Files on the local disk under `UPLOAD_DIR`.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        for area in [StorageArea::Documents, StorageArea::Constitutions] {
            tokio::fs::create_dir_all(root.join(area.directory())).await?;
        }
        log::info!("📁 Upload directory ready: {}", root.display());
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(AppError::validation("Invalid file reference"));
        }
        Ok(self.root.join(relative))
    }
}

/// Keeps a short alphanumeric extension from the uploaded name.
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn generate_key(area: StorageArea, owner: &str, original_name: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!(
        "{}{}-{}{}",
        area.owner_prefix(owner),
        chrono::Utc::now().timestamp_millis(),
        suffix,
        extension_of(original_name)
    )
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, area: StorageArea, owner: &str, original_name: &str, bytes: &[u8]) -> Result<StoredFile, AppError> {
        if owner.is_empty() || !owner.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::internal("Invalid file owner"));
        }
        let key = generate_key(area, owner, original_name);
        tokio::fs::write(self.resolve(&key)?, bytes).await?;
        log::info!("💾 Stored {} ({} bytes)", key, bytes.len());
        Ok(StoredFile {
            key,
            size: bytes.len() as i64,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        match tokio::fs::read(self.resolve(key)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        match tokio::fs::remove_file(self.resolve(key)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
