use axum::{Json, extract::{Path, State}, http::StatusCode};
use rand::RngCore;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{hash_password, issue_token, verify_password},
    email,
    error::ApiError,
    models::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
        ResetPasswordRequest, Role,
    },
    repository::NewUser,
};

/// Mints the random one-shot token backing verification and reset links.
fn fresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// register
///
/// [Public Route] Creates a reader account and sends the verification link.
/// No credential is returned; login stays locked until the link is followed.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = MessageResponse),
        (status = 409, description = "Email taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.validate()?;

    if state.repo.get_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::conflict("Your email already exists !"));
    }

    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash: hash_password(&payload.password)?,
            role: Role::Reader,
            verified: false,
        })
        .await?;

    let token = fresh_token();
    state
        .repo
        .create_verification_token(user.id, &token)
        .await?;

    let link = format!("{}/{}/verify/{}", state.config.client_domain, user.id, token);
    state
        .mailer
        .send(
            std::slice::from_ref(&user.email),
            "Verify your email !",
            &email::verification_email(&user.username, &link),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "We sent you an email. Please verify your email address.",
        )),
    ))
}

/// login
///
/// [Public Route] Verifies credentials and returns the signed bearer
/// credential. An unverified account gets a fresh verification email and a
/// retry message instead of a token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses((status = 200, description = "Logged in", body = LoginResponse))
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.validate()?;

    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::invalid("Invalid email or password !"))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::invalid("Invalid email or password !"));
    }

    if !user.verified {
        // Reuse the pending token if one exists so earlier emails stay valid.
        let token = match state.repo.find_token_for_user(user.id).await? {
            Some(existing) => existing.token,
            None => {
                let token = fresh_token();
                state.repo.create_verification_token(user.id, &token).await?;
                token
            }
        };
        let link = format!("{}/{}/verify/{}", state.config.client_domain, user.id, token);
        state
            .mailer
            .send(
                std::slice::from_ref(&user.email),
                "Verify your email !",
                &email::verification_email(&user.username, &link),
            )
            .await?;
        return Err(ApiError::invalid(
            "We sent you an email. Please verify your email address.",
        ));
    }

    let token = issue_token(&user, &state.config.jwt_secret)?;
    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        avatar_url: user.avatar_url,
        token,
    }))
}

/// verify_account
///
/// [Public Route] Consumes a verification link, flipping the account's
/// verified flag and burning the token.
#[utoipa::path(
    get,
    path = "/api/auth/{user_id}/verify/{token}",
    responses((status = 200, description = "Verified", body = MessageResponse))
)]
pub async fn verify_account(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(Uuid, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::invalid("Invalid link !"))?;

    state
        .repo
        .find_verification_token(user.id, &token)
        .await?
        .ok_or_else(|| ApiError::invalid("Invalid link !"))?;

    state.repo.set_user_verified(user.id).await?;
    state.repo.delete_verification_tokens(user.id).await?;

    Ok(Json(MessageResponse::new(
        "Your account has been verified successfully !",
    )))
}

/// forgot_password
///
/// [Public Route] Sends a password-reset link to the account email.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset link sent", body = MessageResponse))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;

    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::invalid("User with given email does not exist !"))?;

    let token = match state.repo.find_token_for_user(user.id).await? {
        Some(existing) => existing.token,
        None => {
            let token = fresh_token();
            state.repo.create_verification_token(user.id, &token).await?;
            token
        }
    };

    let link = format!(
        "{}/reset-password/{}/{}",
        state.config.client_domain, user.id, token
    );
    state
        .mailer
        .send(
            std::slice::from_ref(&user.email),
            "Reset your password",
            &email::password_reset_email(&user.username, &link),
        )
        .await?;

    Ok(Json(MessageResponse::new(
        "Password reset link sent to your email. Please check your inbox!",
    )))
}

/// check_reset_link
///
/// [Public Route] Validates a reset link before the client renders the
/// new-password form.
#[utoipa::path(
    get,
    path = "/api/auth/reset-password/{user_id}/{token}",
    responses((status = 200, description = "Link valid", body = MessageResponse))
)]
pub async fn check_reset_link(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(Uuid, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::invalid("Invalid link !"))?;
    state
        .repo
        .find_verification_token(user_id, &token)
        .await?
        .ok_or_else(|| ApiError::invalid("Invalid link !"))?;
    Ok(Json(MessageResponse::new("Valid link !")))
}

/// reset_password
///
/// [Public Route] Consumes a reset link and replaces the credential hash.
/// Following the link also proves mailbox ownership, so an unverified account
/// becomes verified here.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password/{user_id}/{token}",
    request_body = ResetPasswordRequest,
    responses((status = 200, description = "Password reset", body = MessageResponse))
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(Uuid, String)>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;

    let user = state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::invalid("Invalid link !"))?;
    state
        .repo
        .find_verification_token(user.id, &token)
        .await?
        .ok_or_else(|| ApiError::invalid("Invalid link !"))?;

    if !user.verified {
        state.repo.set_user_verified(user.id).await?;
    }

    let hash = hash_password(&payload.password)?;
    state.repo.update_credentials(user.id, &hash, None).await?;
    state.repo.delete_verification_tokens(user.id).await?;

    Ok(Json(MessageResponse::new(
        "Password reset successfully, please log in!",
    )))
}
