//! Local filesystem implementation of `MediaStorage`.
//! Content-addressable storage with directory sharding and thumbnails.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use domains::{DomainError, DomainResult, MediaStorage, StoredMedia};
use image::ImageReader;
use sha2::{Digest, Sha256};
use tokio::fs;

const THUMBNAIL_EDGE: u32 = 256;

pub struct LocalMediaStorage {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/uploads")
    url_prefix: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix: String = url_prefix.into();
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// "ab/cd/abcd...hash.ext"
    fn relative_path(key: &str) -> String {
        format!("{}/{}/{}", &key[0..2], &key[2..4], key)
    }

    fn thumbnail_key(key: &str) -> String {
        let stem = key.split('.').next().unwrap_or(key);
        format!("{stem}_thumb.webp")
    }

    fn absolute(&self, key: &str) -> PathBuf {
        self.root_path.join(Self::relative_path(key))
    }

    fn extension_for(content_type: &mime::Mime) -> &'static str {
        match content_type.subtype().as_str() {
            "png" => "png",
            "jpeg" => "jpg",
            "gif" => "gif",
            "webp" => "webp",
            _ => "bin",
        }
    }

    fn valid_key(key: &str) -> bool {
        key.len() > 4 && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    /// Saves an upload using its SHA-256 hash as the filename, which
    /// deduplicates identical files.
    async fn store(&self, data: Bytes, content_type: mime::Mime) -> DomainResult<StoredMedia> {
        let hash = hex::encode(Sha256::digest(&data));
        let key = format!("{hash}.{}", Self::extension_for(&content_type));
        let target = self.absolute(&key);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(DomainError::internal)?;
        }

        let mut thumbnail_url = None;
        if fs::try_exists(&target).await.map_err(DomainError::internal)? {
            tracing::debug!(%key, "upload deduplicated");
            let thumb_key = Self::thumbnail_key(&key);
            if fs::try_exists(self.absolute(&thumb_key)).await.unwrap_or(false) {
                thumbnail_url = Some(self.url_for(&thumb_key));
            }
        } else {
            fs::write(&target, &data).await.map_err(DomainError::internal)?;
            if content_type.type_() == mime::IMAGE {
                thumbnail_url = self.generate_thumbnail(data.clone(), &key).await?.map(|k| self.url_for(&k));
            }
        }

        Ok(StoredMedia {
            url: self.url_for(&key),
            key,
            thumbnail_url,
            content_type: content_type.essence_str().to_string(),
            size: data.len() as u64,
        })
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        if !Self::valid_key(key) {
            return Err(DomainError::validation("invalid media key"));
        }
        for path in [self.absolute(key), self.absolute(&Self::thumbnail_key(key))] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(DomainError::internal(e)),
            }
        }
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, Self::relative_path(key))
    }
}

impl LocalMediaStorage {
    /// Decodes off the async runtime and writes a WebP thumbnail beside the
    /// original. Returns the thumbnail key, or `None` if the bytes are not a
    /// decodable image.
    async fn generate_thumbnail(&self, data: Bytes, key: &str) -> DomainResult<Option<String>> {
        let thumb_key = Self::thumbnail_key(key);
        let thumb_path = self.absolute(&thumb_key);

        let result = tokio::task::spawn_blocking(move || write_thumbnail(&data, &thumb_path))
            .await
            .map_err(DomainError::internal)?;

        match result {
            Ok(()) => Ok(Some(thumb_key)),
            Err(e) => {
                tracing::warn!(%key, error = %e, "thumbnail generation skipped");
                Ok(None)
            }
        }
    }
}

fn write_thumbnail(data: &[u8], path: &Path) -> Result<(), image::ImageError> {
    let img = ImageReader::new(Cursor::new(data)).with_guessed_format()?.decode()?;
    img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE)
        .save_with_format(path, image::ImageFormat::WebP)
}
