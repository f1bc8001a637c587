use std::path::Path;

use chrono::Utc;
use tokio::fs;
use tracing::info;
use url::Url;

use crate::{
    db::DbPool,
    error::AppError,
    models::profile::{Profile, ProfileUpdate},
};

const PROFILE_COLUMNS: &str =
    "id, username, first_name, last_name, avatar_url, created_at, updated_at";

pub async fn get_profile(db: &DbPool, user_uuid: &str) -> Result<Profile, AppError> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"
    ))
    .bind(user_uuid)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound)
}

pub async fn update_profile(
    db: &DbPool,
    user_uuid: &str,
    update: ProfileUpdate,
) -> Result<Profile, AppError> {
    let mut profile = get_profile(db, user_uuid).await?;
    if update.username.is_some() {
        profile.username = update.username;
    }
    if update.first_name.is_some() {
        profile.first_name = update.first_name;
    }
    if update.last_name.is_some() {
        profile.last_name = update.last_name;
    }
    if update.avatar_url.is_some() {
        profile.avatar_url = update.avatar_url;
    }
    profile.updated_at = Utc::now();
    sqlx::query(
        "UPDATE profiles SET username = ?1, first_name = ?2, last_name = ?3, avatar_url = ?4, \
         updated_at = ?5 WHERE id = ?6",
    )
    .bind(&profile.username)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.avatar_url)
    .bind(profile.updated_at)
    .bind(&profile.id)
    .execute(db)
    .await?;
    Ok(profile)
}

/// File extension for the accepted avatar image types.
pub fn avatar_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Stores the image under `avatar_root` and points the profile at its public URL.
pub async fn upload_avatar(
    db: &DbPool,
    avatar_root: &Path,
    public_base_url: &Url,
    user_uuid: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<String, AppError> {
    let Some(extension) = avatar_extension(content_type) else {
        return Err(AppError::BadRequest(
            "Avatar must be a PNG, JPEG, WebP or GIF image.".into(),
        ));
    };
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Avatar upload is empty.".into()));
    }

    let file_name = format!("{user_uuid}-{}.{extension}", Utc::now().timestamp_millis());
    fs::create_dir_all(avatar_root).await?;
    fs::write(avatar_root.join(&file_name), bytes).await?;

    let url = public_base_url
        .join(&format!("avatars/{file_name}"))
        .map_err(|err| AppError::Other(err.into()))?
        .to_string();
    update_profile(
        db,
        user_uuid,
        ProfileUpdate {
            avatar_url: Some(url.clone()),
            ..ProfileUpdate::default()
        },
    )
    .await?;
    info!(user = %user_uuid, file = %file_name, "avatar uploaded");
    Ok(url)
}
