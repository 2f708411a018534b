use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use super::month_ago;
use crate::{
    AppState,
    auth::{AuthUser, hash_password},
    error::ApiError,
    models::{
        CategoryStat, CategoryStatsResponse, CommentView, CreateAuthorRequest, DashboardStats,
        MessageResponse, Role, RoleCount, UserOverview,
    },
    policy,
    repository::NewUser,
};

/// dashboard_stats
///
/// [Admin Route] Core counters for the admin dashboard, recomputed from the
/// store on every read: totals plus trailing-30-day deltas.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses((status = 200, description = "Stats", body = DashboardStats))
)]
pub async fn dashboard_stats(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    policy::ensure_admin(&caller)?;
    let since = month_ago();

    let posts = state.repo.count_posts(None, None).await?;
    let posts_last_month = state.repo.count_posts(None, Some(since)).await?;
    let admins = state.repo.count_users_by_role(Role::Admin, None).await?;
    let authors = state.repo.count_users_by_role(Role::Author, None).await?;
    let authors_last_month = state
        .repo
        .count_users_by_role(Role::Author, Some(since))
        .await?;
    let readers = state.repo.count_users_by_role(Role::Reader, None).await?;
    let readers_last_month = state
        .repo
        .count_users_by_role(Role::Reader, Some(since))
        .await?;
    let comments = state.repo.count_comments(None).await?;
    let comments_last_month = state.repo.count_comments(Some(since)).await?;
    let subscribers = state.repo.count_subscriptions().await?;

    Ok(Json(DashboardStats {
        posts,
        posts_last_month,
        users: admins + authors + readers,
        authors,
        authors_last_month,
        readers,
        readers_last_month,
        comments,
        comments_last_month,
        subscribers,
    }))
}

/// category_stats
///
/// [Admin Route] Post distribution across categories: the four largest shown
/// individually, the rest folded into an "other" bucket, plus the most
/// popular category.
#[utoipa::path(
    get,
    path = "/api/admin/posts/stats",
    responses((status = 200, description = "Stats", body = CategoryStatsResponse))
)]
pub async fn category_stats(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CategoryStatsResponse>, ApiError> {
    policy::ensure_admin(&caller)?;

    let rows = state.repo.category_post_stats().await?;
    let popular = rows.iter().max_by_key(|s| s.posts).cloned();

    let mut stats: Vec<CategoryStat> = rows.iter().take(4).cloned().collect();
    if rows.len() > 4 {
        stats.push(CategoryStat {
            category: "other".to_string(),
            posts: rows.iter().skip(4).map(|s| s.posts).sum(),
        });
    }

    Ok(Json(CategoryStatsResponse { stats, popular }))
}

/// list_users
///
/// [Admin Route] Every account, enriched with engagement totals.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses((status = 200, description = "Users", body = [UserOverview]))
)]
pub async fn list_users(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserOverview>>, ApiError> {
    policy::ensure_admin(&caller)?;
    Ok(Json(state.repo.list_user_overviews(None).await?))
}

/// list_authors
#[utoipa::path(
    get,
    path = "/api/admin/users/authors",
    responses((status = 200, description = "Authors", body = [UserOverview]))
)]
pub async fn list_authors(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserOverview>>, ApiError> {
    policy::ensure_admin(&caller)?;
    Ok(Json(
        state.repo.list_user_overviews(Some(Role::Author)).await?,
    ))
}

/// list_readers
#[utoipa::path(
    get,
    path = "/api/admin/users/readers",
    responses((status = 200, description = "Readers", body = [UserOverview]))
)]
pub async fn list_readers(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserOverview>>, ApiError> {
    policy::ensure_admin(&caller)?;
    Ok(Json(
        state.repo.list_user_overviews(Some(Role::Reader)).await?,
    ))
}

/// authors_count
#[utoipa::path(
    get,
    path = "/api/admin/users/authors/count",
    responses((status = 200, description = "Count", body = RoleCount))
)]
pub async fn authors_count(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<RoleCount>, ApiError> {
    policy::ensure_admin(&caller)?;
    Ok(Json(RoleCount {
        total: state.repo.count_users_by_role(Role::Author, None).await?,
        last_month: state
            .repo
            .count_users_by_role(Role::Author, Some(month_ago()))
            .await?,
    }))
}

/// readers_count
#[utoipa::path(
    get,
    path = "/api/admin/users/readers/count",
    responses((status = 200, description = "Count", body = RoleCount))
)]
pub async fn readers_count(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<RoleCount>, ApiError> {
    policy::ensure_admin(&caller)?;
    Ok(Json(RoleCount {
        total: state.repo.count_users_by_role(Role::Reader, None).await?,
        last_month: state
            .repo
            .count_users_by_role(Role::Reader, Some(month_ago()))
            .await?,
    }))
}

/// create_author
///
/// [Admin Route] Mints an author account directly. The account is created
/// verified — admin action stands in for the email round-trip.
#[utoipa::path(
    post,
    path = "/api/admin/users/authors",
    request_body = CreateAuthorRequest,
    responses(
        (status = 201, description = "Created", body = MessageResponse),
        (status = 409, description = "Email taken")
    )
)]
pub async fn create_author(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    policy::ensure_admin(&caller)?;
    payload.validate()?;

    if state.repo.get_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::conflict("This email already exists !"));
    }

    state
        .repo
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash: hash_password(&payload.password)?,
            role: Role::Author,
            verified: true,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Author created successfully !")),
    ))
}

/// all_comments
///
/// [Admin Route] Every comment in the system, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/comments",
    responses((status = 200, description = "Comments", body = [CommentView]))
)]
pub async fn all_comments(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    policy::ensure_admin(&caller)?;
    Ok(Json(state.repo.all_comments().await?))
}
