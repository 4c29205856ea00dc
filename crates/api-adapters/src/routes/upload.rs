//! Multipart image uploads. The form field is `file`; its declared content
//! type is checked by the media service.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use domains::{StoredMedia, UserProfile};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Room for multipart framing on top of the file itself.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/avatar", post(avatar))
        .route("/game-image", post(game_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes + FORM_OVERHEAD))
}

#[derive(Debug, Serialize)]
pub struct AvatarUploaded {
    pub media: StoredMedia,
    pub user: UserProfile,
}

async fn file_field(multipart: &mut Multipart) -> ApiResult<(Bytes, String)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| field.file_name().and_then(guess_type))
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
        let data = field.bytes().await?;
        return Ok((data, content_type));
    }
    Err(ApiError::BadRequest("missing multipart field 'file'".into()))
}

/// Fallback for clients that send no part content type.
fn guess_type(file_name: &str) -> Option<String> {
    mime_guess::from_path(file_name).first().map(|m| m.essence_str().to_string())
}

async fn avatar(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    mut multipart: Multipart,
) -> ApiResult<ApiResponse<AvatarUploaded>> {
    let (data, content_type) = file_field(&mut multipart).await?;
    let (media, user) = state.services.media.upload_avatar(&actor, data, &content_type).await?;
    Ok(ApiResponse::created(AvatarUploaded { media, user }))
}

async fn game_image(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    mut multipart: Multipart,
) -> ApiResult<ApiResponse<StoredMedia>> {
    let (data, content_type) = file_field(&mut multipart).await?;
    let media = state.services.media.upload_game_image(&actor, data, &content_type).await?;
    Ok(ApiResponse::created(media))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_image_types_from_extension() {
        assert_eq!(guess_type("cover.JPG").as_deref(), Some("image/jpeg"));
        assert_eq!(guess_type("map.webp").as_deref(), Some("image/webp"));
        assert_eq!(guess_type("notes.txt").as_deref(), Some("text/plain"));
        assert_eq!(guess_type("noext"), None);
    }
}
