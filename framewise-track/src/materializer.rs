//! Resolves image references to files in a content-addressed cache
//!
//! A reference is either an HTTP(S) URL or a base64 data URI. Each one maps
//! to `<workspace>/images/<md5(reference)><ext>`; once that file exists it is
//! reused without touching the network again. Files are written to a unique
//! temporary name and renamed into place, so readers never see partial
//! images and racing writers of the same reference are harmless. A temporary
//! file is removed when its writer fails or is dropped mid-transfer.

use crate::error::MaterializeError;
use base64::{engine::general_purpose, Engine as _};
use futures::stream::{self, StreamExt};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub const JPEG_DATA_PREFIX: &str = "data:image/jpeg;base64,";
pub const PNG_DATA_PREFIX: &str = "data:image/png;base64,";

/// Longest reference echoed into logs and errors.
const PREVIEW_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct ImageMaterializer {
    images_dir: PathBuf,
    client: reqwest::Client,
    workers: usize,
}

impl ImageMaterializer {
    /// `workers` bounds how many references are fetched at once.
    pub fn new(
        images_dir: impl Into<PathBuf>,
        workers: usize,
        download_timeout: Duration,
    ) -> Result<Self, MaterializeError> {
        let client = reqwest::Client::builder()
            .timeout(download_timeout)
            .build()
            .map_err(|e| MaterializeError::Client(e.to_string()))?;

        Ok(Self {
            images_dir: images_dir.into(),
            client,
            workers: workers.max(1),
        })
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Deterministic cache location of a reference.
    pub fn cache_path(&self, reference: &str) -> PathBuf {
        let name = hex::encode(Md5::digest(reference.as_bytes()));
        self.images_dir.join(format!("{}{}", name, extension_of(reference)))
    }

    /// Resolve every reference, in parallel. The returned paths line up with
    /// `references` index for index. The first failure aborts the whole call
    /// and drops the work still in flight.
    pub async fn materialize(&self, references: &[String]) -> Result<Vec<PathBuf>, MaterializeError> {
        tokio::fs::create_dir_all(&self.images_dir).await?;

        let mut paths = vec![PathBuf::new(); references.len()];
        let mut pending = stream::iter(references.iter().cloned().enumerate())
            .map(|(index, reference)| async move {
                let result = self.prepare(index, &reference).await;
                (index, result)
            })
            .buffer_unordered(self.workers);

        while let Some((index, result)) = pending.next().await {
            paths[index] = result?;
        }

        Ok(paths)
    }

    async fn prepare(&self, index: usize, reference: &str) -> Result<PathBuf, MaterializeError> {
        let path = self.cache_path(reference);
        if tokio::fs::try_exists(&path).await? {
            debug!(index, path = %path.display(), "image already cached");
            return Ok(path);
        }

        let result = match inline_payload(reference) {
            Some(payload) => self.save_inline(reference, payload, &path).await,
            None => self.download(reference, &path).await,
        };

        match &result {
            Ok(()) => info!(index, path = %path.display(), "prepared image"),
            Err(e) => warn!(index, error = %e, "failed to prepare image"),
        }
        result.map(|_| path)
    }

    async fn save_inline(&self, reference: &str, payload: &str, path: &Path) -> Result<(), MaterializeError> {
        debug!("saving inline image to {}", path.display());
        let bytes = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| MaterializeError::DecodeFailed {
                reference: preview(reference),
            })?;

        let part = self.partial_file(path)?;
        let mut file = tokio::fs::File::from_std(part.as_file().try_clone()?);
        file.write_all(&bytes).await?;
        file.flush().await?;
        commit(part, path)
    }

    async fn download(&self, reference: &str, path: &Path) -> Result<(), MaterializeError> {
        debug!("downloading image from {} to {}", preview(reference), path.display());
        let failed = |cause: String| MaterializeError::DownloadFailed {
            reference: preview(reference),
            cause,
        };

        let mut response = self
            .client
            .get(reference)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let part = self.partial_file(path)?;
        let mut file = tokio::fs::File::from_std(part.as_file().try_clone()?);
        while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        commit(part, path)
    }

    /// `.<name>.<random>.part` next to `path`, deleted on drop unless committed.
    fn partial_file(&self, path: &Path) -> Result<NamedTempFile, MaterializeError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let part = tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(".part")
            .tempfile_in(&self.images_dir)?;
        Ok(part)
    }
}

/// The base64 payload of a supported data URI.
pub fn inline_payload(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(JPEG_DATA_PREFIX)
        .or_else(|| reference.strip_prefix(PNG_DATA_PREFIX))
}

/// Cache file extension: from the MIME tag of a data URI, otherwise from the
/// URL path. May be empty.
pub fn extension_of(reference: &str) -> String {
    if reference.starts_with(JPEG_DATA_PREFIX) {
        return ".jpg".to_string();
    }
    if reference.starts_with(PNG_DATA_PREFIX) {
        return ".png".to_string();
    }

    let path = match reqwest::Url::parse(reference) {
        Ok(url) => url.path().to_string(),
        Err(_) => reference.to_string(),
    };
    // a trailing slash means the last component is a directory
    if path.ends_with('/') {
        return String::new();
    }
    Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Short, log-safe form of a reference. Inline payloads are never echoed.
pub fn preview(reference: &str) -> String {
    if let Some(comma) = reference.find(',').filter(|_| reference.starts_with("data:")) {
        return format!("{}<{} bytes>", &reference[..=comma], reference.len() - comma - 1);
    }
    if reference.chars().count() <= PREVIEW_LEN {
        return reference.to_string();
    }
    let head: String = reference.chars().take(PREVIEW_LEN).collect();
    format!("{}...", head)
}

/// Rename a finished temporary file into place.
fn commit(part: NamedTempFile, path: &Path) -> Result<(), MaterializeError> {
    part.persist(path).map_err(|e| MaterializeError::Io(e.error))?;
    Ok(())
}
