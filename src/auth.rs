use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::{Role, User},
    repository::RepositoryState,
};

// Token lifetime: seven days.
const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Claims
///
/// The payload structure inside a bearer token. Signed with the server secret
/// at login and validated on every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the UUID of the user.
    pub sub: Uuid,
    /// Role snapshot at issue time. The extractor re-resolves the current
    /// role from the database, so a demotion takes effect immediately.
    pub role: Role,
    /// Expiration time, seconds since the epoch.
    pub exp: usize,
    /// Issued at, seconds since the epoch.
    pub iat: usize,
}

/// Signs a bearer credential for the given user.
pub fn issue_token(user: &User, secret: &str) -> Result<String, ApiError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        role: user.role,
        exp: (now + TOKEN_TTL_SECS) as usize,
        iat: now as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

/// Hashes a password with Argon2id and a per-password random salt, producing
/// a PHC-formatted string safe for database storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Verifies a password against its stored hash in constant time.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| ApiError::Internal(format!("invalid password hash format: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take this as
/// an argument to retrieve the caller's id and role for authorization checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's `FromRequestParts`, making `AuthUser` usable as a
/// function argument in any authenticated handler and keeping authentication
/// out of the business logic.
///
/// The flow:
/// 1. Dependency resolution: Repository and AppConfig from the app state.
/// 2. Local bypass: development-time access via the `x-user-id` header,
///    guarded by the Env check.
/// 3. Token validation: Bearer extraction and JWT decoding.
/// 4. DB lookup: the user must still exist; the current role wins over the
///    token's role snapshot.
///
/// Rejection: `Unauthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local development bypass: a known user UUID in the 'x-user-id'
        // header authenticates directly, but only when running locally and
        // only if the id maps to a real row (so roles load correctly).
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Ok(Some(user)) = repo.get_user(user_id).await {
                            return Ok(AuthUser {
                                id: user.id,
                                role: user.role,
                            });
                        }
                    }
                }
            }
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| ApiError::Unauthenticated)?;

        // Final verification: a token for a deleted account is worthless, and
        // the stored role is authoritative.
        let user = repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}
