use std::path::{Path, PathBuf};

use anyhow::Result;
use bytes::Bytes;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use grams_db::ValidationErrors;

/// 10 MB upload limit for pictures
pub const MAX_PICTURE_SIZE: usize = 10 * 1024 * 1024;

/// Request bodies up to this size are read; a picture over
/// [`MAX_PICTURE_SIZE`] inside one is reported as a validation error.
pub const MAX_REQUEST_BODY: usize = 4 * MAX_PICTURE_SIZE;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "gif", "png"];

/// A file part pulled out of a multipart submission.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    /// Set when the part exceeded [`MAX_PICTURE_SIZE`]; `bytes` is then empty.
    pub oversized: bool,
}

impl Upload {
    /// Browsers send an empty part for a file input left blank.
    pub fn is_blank(&self) -> bool {
        !self.oversized && self.bytes.is_empty() && self.file_name.as_deref().is_none_or(str::is_empty)
    }

    fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }

    /// Checks the upload is an acceptable picture and returns the extension
    /// it will be stored under.
    pub fn check(&self) -> Result<String, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let ext = self
            .extension()
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
        let is_image = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"));

        if self.oversized || self.bytes.len() > MAX_PICTURE_SIZE {
            errors.push("picture", "Picture is too large (maximum is 10 MB)");
        }
        if self.bytes.is_empty() {
            errors.push("picture", "Picture can't be blank");
        }
        if ext.is_none() || !is_image {
            errors.push("picture", "Picture must be a JPG, JPEG, GIF or PNG image");
        }

        match ext {
            Some(ext) if errors.is_empty() => Ok(ext),
            _ => Err(errors),
        }
    }
}

/// Manages on-disk picture storage.
///
/// Each picture is stored as a flat file at `{dir}/{uuid}.{ext}` and served
/// back under `/pictures/`.
pub struct PictureStore {
    dir: PathBuf,
}

impl PictureStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Picture storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh file name for a picture with the given extension.
    pub fn allocate_name(&self, ext: &str) -> String {
        format!("{}.{}", Uuid::new_v4(), ext)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.path(name), bytes).await?;
        info!("Stored picture {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    /// Delete a stored picture. A file that is already gone is not an error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)).await {
            Ok(()) => {
                info!("Deleted picture {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Picture {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort cleanup; failures are logged and otherwise ignored.
    pub async fn discard(&self, name: &str) {
        if let Err(e) = self.delete(name).await {
            warn!("Failed to delete picture {}: {}", name, e);
        }
    }
}
