use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use domains::{Actor, DomainError, DomainResult, MediaStorage, StoredMedia, User, UserProfile, UserRepository};

const ALLOWED_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn MediaStorage>,
    users: Arc<dyn UserRepository>,
    max_bytes: u64,
}

impl MediaService {
    pub fn new(storage: Arc<dyn MediaStorage>, users: Arc<dyn UserRepository>, max_bytes: u64) -> Self {
        Self { storage, users, max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Stores the image and points the caller's avatar at it.
    pub async fn upload_avatar(
        &self,
        actor: &Actor,
        data: Bytes,
        content_type: &str,
    ) -> DomainResult<(StoredMedia, UserProfile)> {
        let mut user = self.uploader(actor).await?;
        let stored = self.store_image(data, content_type).await?;
        user.avatar_url = Some(stored.url.clone());
        user.updated_at = Utc::now();
        let user = self.users.update(user).await?;
        Ok((stored, UserProfile::private(&user)))
    }

    /// Game cover images, for hosts only.
    pub async fn upload_game_image(&self, actor: &Actor, data: Bytes, content_type: &str) -> DomainResult<StoredMedia> {
        let user = self.uploader(actor).await?;
        if !user.can_host() {
            return Err(DomainError::forbidden("only GMs can upload game images"));
        }
        self.store_image(data, content_type).await
    }

    async fn uploader(&self, actor: &Actor) -> DomainResult<User> {
        self.users
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", actor.id))
    }

    async fn store_image(&self, data: Bytes, content_type: &str) -> DomainResult<StoredMedia> {
        let mime: mime::Mime = content_type
            .parse()
            .map_err(|_| DomainError::validation("unrecognized content type"))?;
        let essence = mime.essence_str();
        if !ALLOWED_TYPES.contains(&essence) {
            return Err(DomainError::validation("only PNG, JPEG, WebP and GIF images are allowed"));
        }
        if data.is_empty() {
            return Err(DomainError::validation("file is empty"));
        }
        if data.len() as u64 > self.max_bytes {
            return Err(DomainError::validation(format!("file exceeds the {} byte limit", self.max_bytes)));
        }
        let stored = self.storage.store(data, mime).await?;
        tracing::info!(key = %stored.key, size = stored.size, "image stored");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use domains::Role;

    #[tokio::test]
    async fn avatar_upload_sets_profile_url() {
        let h = Harness::new();
        let player = h.user("kate", Role::Player).await;
        let (stored, profile) = h
            .services
            .media
            .upload_avatar(&player, Bytes::from_static(b"\x89PNG...."), "image/png")
            .await
            .unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some(stored.url.as_str()));
    }

    #[tokio::test]
    async fn rejects_wrong_type_size_and_non_hosts() {
        let h = Harness::new();
        let player = h.user("kate", Role::Player).await;
        let media = &h.services.media;

        let pdf = media.upload_avatar(&player, Bytes::from_static(b"%PDF"), "application/pdf").await;
        assert!(matches!(pdf, Err(DomainError::Validation(_))));

        let big = Bytes::from(vec![0u8; media.max_bytes() as usize + 1]);
        let too_big = media.upload_avatar(&player, big, "image/jpeg").await;
        assert!(matches!(too_big, Err(DomainError::Validation(_))));

        let cover = media.upload_game_image(&player, Bytes::from_static(b"GIF89a"), "image/gif").await;
        assert!(matches!(cover, Err(DomainError::Forbidden(_))));
    }
}
