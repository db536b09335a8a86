use std::path::Path;

use axum::{body::Bytes, extract::Multipart};

use crate::{
    database::Database, errors::AppError, log_and_wrap_custom_internal, models::User,
    utils::secure_filename,
};

#[derive(Debug)]
pub struct Avatar {
    pub filename: String,
    pub content: Bytes,
}

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub bio: String,
    pub avatar: Option<Avatar>,
}

impl ProfileUpdate {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut update = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::debug!(error = %e, "unreadable multipart body");
            AppError::validation("The form could not be read.")
        })? {
            let name = field.name().unwrap_or_default().to_owned();
            let filename = field.file_name().map(str::to_owned);
            let content = field.bytes().await.map_err(|e| {
                tracing::debug!(error = %e, "unreadable multipart field");
                AppError::validation("The form could not be read.")
            })?;

            match name.as_str() {
                "full_name" => update.full_name = String::from_utf8_lossy(&content).trim().to_owned(),
                "bio" => update.bio = String::from_utf8_lossy(&content).trim().to_owned(),
                // Browsers send an empty part when no file was picked.
                "avatar" => {
                    if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                        update.avatar = Some(Avatar { filename, content });
                    }
                }
                _ => {}
            }
        }

        Ok(update)
    }
}

/// Applies the update to `user`. A refused avatar fails before the profile
/// or the disk is touched.
pub async fn update_profile(
    database: &Database,
    uploads_dir: &Path,
    user: &mut User,
    update: ProfileUpdate,
) -> Result<(), AppError> {
    let avatar = match &update.avatar {
        Some(avatar) => {
            let filename = secure_filename(&avatar.filename).ok_or_else(|| {
                AppError::validation("Allowed image types are png, jpg, jpeg, gif and webp.")
            })?;
            Some((format!("{}_{}", user.id, filename), &avatar.content))
        }
        None => None,
    };

    if let Some((filename, content)) = avatar {
        tokio::fs::create_dir_all(uploads_dir)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        tokio::fs::write(uploads_dir.join(&filename), content)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        user.avatar_url = format!("/static/uploads/{}", filename);
    }

    user.full_name = update.full_name;
    user.bio = update.bio;
    user.update_profile(&**database).await?;
    tracing::info!(user_id = user.id, "profile updated");
    Ok(())
}
