use axum::{
    Json,
    extract::{Query, State},
};

use super::{LimitQuery, month_ago};
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{AuthorCategoryStats, AuthorStats, Post},
    policy,
};

/// author_stats
///
/// [Authenticated Route — authors] The caller's dashboard: post volume and
/// the engagement their content has received, with trailing-30-day deltas.
#[utoipa::path(
    get,
    path = "/api/me/stats",
    responses((status = 200, description = "Stats", body = AuthorStats))
)]
pub async fn author_stats(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AuthorStats>, ApiError> {
    policy::ensure_author(&caller)?;
    let since = month_ago();

    let posts = state.repo.count_posts(Some(caller.id), None).await?;
    let posts_last_month = state.repo.count_posts(Some(caller.id), Some(since)).await?;
    let post_likes = state.repo.author_post_like_total(caller.id).await?;
    let comments_on_posts = state
        .repo
        .count_comments_on_author_posts(caller.id, None)
        .await?;
    let comments_on_posts_last_month = state
        .repo
        .count_comments_on_author_posts(caller.id, Some(since))
        .await?;
    let comment_likes = state.repo.comment_like_total(caller.id).await?;

    Ok(Json(AuthorStats {
        posts,
        posts_last_month,
        post_likes,
        comments_on_posts,
        comments_on_posts_last_month,
        comment_likes,
    }))
}

/// my_latest_posts
///
/// [Authenticated Route — authors] The caller's most recent posts.
#[utoipa::path(
    get,
    path = "/api/me/posts/latest",
    params(LimitQuery),
    responses((status = 200, description = "Posts", body = [Post]))
)]
pub async fn my_latest_posts(
    caller: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    policy::ensure_author(&caller)?;
    let limit = query
        .limit
        .ok_or_else(|| ApiError::invalid("No limit provided !"))?;
    let posts = state.repo.latest_posts_by_author(caller.id, limit).await?;
    Ok(Json(posts))
}

/// my_category_stats
///
/// [Authenticated Route — authors] The caller's post distribution across
/// categories (top six), with the leading category called out.
#[utoipa::path(
    get,
    path = "/api/me/posts/stats",
    responses((status = 200, description = "Stats", body = AuthorCategoryStats))
)]
pub async fn my_category_stats(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AuthorCategoryStats>, ApiError> {
    policy::ensure_author(&caller)?;

    let rows = state.repo.author_category_stats(caller.id).await?;
    let top_category = rows.iter().max_by_key(|s| s.posts).cloned();
    let categories = rows.into_iter().take(6).collect();

    Ok(Json(AuthorCategoryStats {
        categories,
        top_category,
    }))
}
