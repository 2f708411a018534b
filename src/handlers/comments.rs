use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use super::PageQuery;
use crate::{
    AppState, cascade,
    auth::AuthUser,
    error::ApiError,
    models::{
        CommentView, CreateCommentRequest, DeleteCommentsRequest, LikeResponse, MessageResponse,
        PagedComments, UpdateCommentRequest, UserCommentView,
    },
    policy::{self, Action},
};

/// create_comment
///
/// [Authenticated Route] Posts a comment. The parent post must exist at
/// creation time; the response carries the enriched view with the author's
/// display data.
#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CreateCommentRequest,
    responses((status = 201, description = "Comment added", body = CommentView))
)]
pub async fn create_comment(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    payload.validate()?;

    let post = state
        .repo
        .get_post(payload.post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;

    let comment = state
        .repo
        .create_comment(post.id, caller.id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// comments_by_post
///
/// [Public Route] All comments under a post, oldest first.
#[utoipa::path(
    get,
    path = "/api/comments/post/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 200, description = "Comments", body = [CommentView]))
)]
pub async fn comments_by_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    state
        .repo
        .get_post(post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;
    let comments = state.repo.comments_by_post(post_id).await?;
    Ok(Json(comments))
}

/// comments_by_user
///
/// [Public Route] A user's comments, enriched with the posts they were left
/// on.
#[utoipa::path(
    get,
    path = "/api/comments/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Comments", body = [UserCommentView]))
)]
pub async fn comments_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserCommentView>>, ApiError> {
    state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let comments = state.repo.comments_by_user(user_id).await?;
    Ok(Json(comments))
}

/// update_comment
///
/// [Authenticated Route] Edits a comment's text. Owner or admin.
#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 403, description = "Not owner")
    )
)]
pub async fn update_comment(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))?;
    policy::ensure_can_mutate(
        &caller,
        Some(comment.user_id),
        Action::Update,
        "You are not authorized, only owner of this comment can update !",
    )?;

    payload.validate()?;
    state.repo.update_comment(comment.id, &payload.content).await?;
    Ok(Json(MessageResponse::new("Comment updated successfully !")))
}

/// toggle_comment_like
///
/// [Authenticated Route] Flips the caller's membership in the comment's
/// like-set. Requires authentication, same as the post variant.
#[utoipa::path(
    put,
    path = "/api/comments/like/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses((status = 200, description = "Toggled", body = LikeResponse))
)]
pub async fn toggle_comment_like(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeResponse>, ApiError> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))?;
    let likes = state.repo.toggle_comment_like(comment.id, caller.id).await?;
    Ok(Json(likes))
}

/// delete_comment
///
/// [Authenticated Route] Deletes a comment. Owner or admin.
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_comment(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))?;
    policy::ensure_can_mutate(
        &caller,
        Some(comment.user_id),
        Action::Delete,
        "You are not authorized, only admin or owner of this comment !",
    )?;

    state.repo.delete_comments(&[comment.id]).await?;
    Ok(Json(MessageResponse::new(
        "Comment has been deleted successfully !",
    )))
}

/// delete_many_comments
///
/// [Authenticated Route] Batch deletion with all-or-nothing resolution and
/// authorization.
#[utoipa::path(
    delete,
    path = "/api/comments",
    request_body = DeleteCommentsRequest,
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_many_comments(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeleteCommentsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;
    let deleted =
        cascade::delete_many_comments(state.repo.as_ref(), &caller, &payload.comments_ids).await?;
    Ok(Json(MessageResponse::new(format!(
        "{deleted} comments have been deleted successfully!"
    ))))
}

/// liked_comments
///
/// [Authenticated Route] The comments the caller has liked, paginated.
#[utoipa::path(
    get,
    path = "/api/comments/liked",
    params(PageQuery),
    responses((status = 200, description = "Comments", body = PagedComments))
)]
pub async fn liked_comments(
    caller: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedComments>, ApiError> {
    let paged = state
        .repo
        .comments_liked_by(caller.id, query.page(), query.per_page())
        .await?;
    Ok(Json(paged))
}
