use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::read_multipart;
use crate::{
    AppState, cascade,
    auth::{AuthUser, hash_password, verify_password},
    error::ApiError,
    models::{MessageResponse, UpdatePasswordRequest, UpdateProfileRequest, UserProfile},
    policy::{self, Action},
    storage::make_asset_key,
};

/// AvatarResponse
///
/// Output of the profile-photo upload: confirmation plus the new public URL.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AvatarResponse {
    pub message: String,
    pub avatar_url: String,
}

/// get_profile
///
/// [Public Route] A user's public profile; the credential hash never leaves
/// the repository layer.
#[utoipa::path(
    get,
    path = "/api/users/profile/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(Json(UserProfile::from(user)))
}

/// get_admin
///
/// [Public Route] The site admin's public profile (about page).
#[utoipa::path(
    get,
    path = "/api/users/admin",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_admin(
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let admin = state
        .repo
        .find_admin()
        .await?
        .ok_or_else(|| ApiError::not_found("Admin"))?;
    Ok(Json(UserProfile::from(admin)))
}

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .get_user(caller.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(Json(UserProfile::from(user)))
}

/// update_profile
///
/// [Authenticated Route] Partial profile update. Self only — profile fields
/// are personal data, so even admins go through account deletion rather than
/// editing someone else's profile.
#[utoipa::path(
    put,
    path = "/api/users/profile/{id}",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 403, description = "Not yourself")
    )
)]
pub async fn update_profile(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if caller.id != id {
        return Err(ApiError::forbidden("Only user himself, access denied !"));
    }
    payload.validate()?;

    state
        .repo
        .update_profile(id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(MessageResponse::new("Profile updated successfully !")))
}

/// update_password
///
/// [Authenticated Route] Replaces the caller's password (and optionally the
/// account email) after re-verifying the current password. Self only.
#[utoipa::path(
    put,
    path = "/api/users/password/{id}",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 403, description = "Not yourself"),
        (status = 409, description = "Email taken")
    )
)]
pub async fn update_password(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if caller.id != id {
        return Err(ApiError::forbidden("Only user himself, access denied !"));
    }
    payload.validate()?;

    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if let Some(email) = &payload.email {
        if let Some(existing) = state.repo.get_user_by_email(email).await? {
            if existing.id != user.id {
                return Err(ApiError::conflict(format!("{email} already exists !")));
            }
        }
    }

    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(ApiError::invalid("Your old password is incorrect!"));
    }

    let hash = hash_password(&payload.new_password)?;
    state
        .repo
        .update_credentials(user.id, &hash, payload.email.as_deref())
        .await?;

    let message = if payload.email.is_some() {
        "Account information updated successfully !"
    } else {
        "Password updated successfully!"
    };
    Ok(Json(MessageResponse::new(message)))
}

/// upload_avatar
///
/// [Authenticated Route] Replaces the caller's profile photo; the previous
/// hosted asset (if any) is released first.
#[utoipa::path(
    post,
    path = "/api/users/profile/upload-profile-photo",
    responses((status = 200, description = "Uploaded", body = AvatarResponse))
)]
pub async fn upload_avatar(
    caller: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>, ApiError> {
    let (_fields, image) = read_multipart(&mut multipart).await?;
    let image = image.ok_or_else(|| ApiError::invalid("No file provided !"))?;

    let user = state
        .repo
        .get_user(caller.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if let Some(old_key) = &user.avatar_key {
        state.assets.release(old_key).await?;
    }

    let asset = state
        .assets
        .store(
            &make_asset_key("avatars", &image.filename),
            image.bytes,
            &image.content_type,
        )
        .await?;
    state
        .repo
        .set_user_avatar(user.id, &asset.url, &asset.key)
        .await?;

    Ok(Json(AvatarResponse {
        message: "Your profile photo has been uploaded successfully !".to_string(),
        avatar_url: asset.url,
    }))
}

/// delete_account
///
/// [Authenticated Route] Deletes an account (self or admin), cascading to the
/// user's posts (with their images and comments), the user's own comments,
/// and the hosted profile photo.
#[utoipa::path(
    delete,
    path = "/api/users/profile/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_account(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::ensure_can_mutate(
        &caller,
        Some(id),
        Action::Delete,
        "Only admin or user himself, access denied !",
    )?;

    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    cascade::delete_user(state.repo.as_ref(), state.assets.as_ref(), &user).await?;

    Ok(Json(MessageResponse::new(
        "Account has been deleted successfully !",
    )))
}
