use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use super::{LimitQuery, PageQuery, read_multipart};
use crate::{
    AppState, cascade, email,
    auth::AuthUser,
    error::ApiError,
    models::{
        CreatePostFields, DeletePostsRequest, LikeResponse, MessageResponse, PagedPosts, Post,
        PostDetail, Role, UpdatePostRequest, slugify,
    },
    policy::{self, Action},
    repository::{NewPost, PostPatch},
    storage::make_asset_key,
};

/// Accepted query parameters for the public post listing: category filter,
/// pagination and case-insensitive search, freely combined.
#[derive(serde::Deserialize, utoipa::IntoParams)]
pub struct PostListQuery {
    pub category: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}

/// create_post
///
/// [Authenticated Route] Submits a new post as a multipart body (cover image
/// plus text fields). Only authors and admins may publish. On success every
/// newsletter address with notifications enabled gets a new-post email.
#[utoipa::path(
    post,
    path = "/api/posts",
    responses(
        (status = 201, description = "Created", body = MessageResponse),
        (status = 403, description = "Not an author"),
        (status = 409, description = "Slug taken")
    )
)]
pub async fn create_post(
    caller: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if !policy::can_author_posts(caller.role) {
        return Err(ApiError::forbidden("Not allowed, only authors or admin !"));
    }

    let (fields, image) = read_multipart(&mut multipart).await?;
    let image = image.ok_or_else(|| ApiError::invalid("No image provided !"))?;

    let payload = CreatePostFields {
        title: fields.get("title").cloned().unwrap_or_default(),
        content: fields.get("content").cloned().unwrap_or_default(),
        category: fields
            .get("category")
            .and_then(|c| Uuid::parse_str(c).ok())
            .ok_or_else(|| ApiError::invalid("category must be a valid id"))?,
    };
    payload.validate()?;

    // Slug uniqueness is checked before any side effect.
    let slug = slugify(&payload.title);
    if state.repo.find_post_by_slug(&slug).await?.is_some() {
        return Err(ApiError::conflict("This title already exists !"));
    }

    let category = state
        .repo
        .get_category(payload.category)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    let asset = state
        .assets
        .store(
            &make_asset_key("posts", &image.filename),
            image.bytes,
            &image.content_type,
        )
        .await?;

    let post = state
        .repo
        .create_post(NewPost {
            title: payload.title,
            slug,
            content: payload.content,
            image_url: asset.url,
            image_key: Some(asset.key),
            author_id: caller.id,
            category_id: category.id,
        })
        .await?;

    // New-post notification for subscribed newsletter addresses.
    let emails = state.repo.notified_emails().await?;
    if !emails.is_empty() {
        let author = state.repo.get_user(caller.id).await?;
        let author_name = author.map(|u| u.username).unwrap_or_default();
        let link = format!("{}/posts/{}", state.config.client_domain, post.slug);
        state
            .mailer
            .send(
                &emails,
                "Newsletter - New Post",
                &email::new_post_email(&author_name, &category.title, &post.title, &link),
            )
            .await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "{} has been created successfully !",
            post.title
        ))),
    ))
}

/// list_posts
///
/// [Public Route] Lists posts, newest first, with optional category filter,
/// pagination and search over title/content.
#[utoipa::path(
    get,
    path = "/api/posts",
    params(PostListQuery),
    responses((status = 200, description = "Posts", body = PagedPosts))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<PagedPosts>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let paged = state
        .repo
        .list_posts(query.category, query.search, page, per_page)
        .await?;
    Ok(Json(paged))
}

/// get_post
///
/// [Public Route] Retrieves a post by slug, together with up to three related
/// posts from the same category and previous/next navigation references.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post slug")),
    responses((status = 200, description = "Found", body = PostDetail))
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>, ApiError> {
    let post = state
        .repo
        .get_post_view_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;

    let related_posts = state
        .repo
        .related_posts(post.category_id, post.id, 3)
        .await?;
    let (prev_post, next_post) = state.repo.neighbor_posts(post.created_at).await?;

    Ok(Json(PostDetail {
        post,
        related_posts,
        prev_post,
        next_post,
    }))
}

/// update_post
///
/// [Authenticated Route] Partial update of a post's text fields. Owner or
/// admin only; a title change re-derives the slug and re-checks uniqueness.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not owner"),
        (status = 409, description = "Slug taken")
    )
)]
pub async fn update_post(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    payload.validate()?;

    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;
    policy::ensure_can_mutate(
        &caller,
        Some(post.author_id),
        Action::Update,
        "You are not authorized to update this post !",
    )?;

    let slug = match &payload.title {
        Some(title) => {
            let slug = slugify(title);
            if let Some(other) = state.repo.find_post_by_slug(&slug).await? {
                if other.id != post.id {
                    return Err(ApiError::conflict("This title already exists !"));
                }
            }
            Some(slug)
        }
        None => None,
    };

    if let Some(category_id) = payload.category {
        state
            .repo
            .get_category(category_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category"))?;
    }

    let updated = state
        .repo
        .update_post(
            post.id,
            PostPatch {
                title: payload.title,
                slug,
                content: payload.content,
                category_id: payload.category,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;

    Ok(Json(updated))
}

/// update_post_image
///
/// [Authenticated Route] Replaces the post's cover image: the old hosted
/// asset is released, the new one stored, and the row repointed.
#[utoipa::path(
    put,
    path = "/api/posts/upload-photo/{id}",
    responses(
        (status = 200, description = "Image updated", body = MessageResponse),
        (status = 403, description = "Not owner")
    )
)]
pub async fn update_post_image(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let (_fields, image) = read_multipart(&mut multipart).await?;
    let image = image.ok_or_else(|| ApiError::invalid("No image provided !"))?;

    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;
    policy::ensure_can_mutate(
        &caller,
        Some(post.author_id),
        Action::Update,
        "You are not allowed, only owner of this post !",
    )?;

    if let Some(old_key) = &post.image_key {
        state.assets.release(old_key).await?;
    }
    let asset = state
        .assets
        .store(
            &make_asset_key("posts", &image.filename),
            image.bytes,
            &image.content_type,
        )
        .await?;
    state
        .repo
        .set_post_image(post.id, &asset.url, &asset.key)
        .await?;

    Ok(Json(MessageResponse::new(
        "Post image has been updated successfully !",
    )))
}

/// toggle_post_like
///
/// [Authenticated Route] Flips the caller's membership in the post's
/// like-set. Applying it twice restores the original set.
#[utoipa::path(
    put,
    path = "/api/posts/like/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 200, description = "Toggled", body = LikeResponse))
)]
pub async fn toggle_post_like(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeResponse>, ApiError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;
    let likes = state.repo.toggle_post_like(post.id, caller.id).await?;
    Ok(Json(likes))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post (owner or admin), cascading to its
/// comments and its hosted cover image.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_post(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;
    policy::ensure_can_mutate(
        &caller,
        Some(post.author_id),
        Action::Delete,
        "You are not allowed to delete this post !",
    )?;

    cascade::delete_post(state.repo.as_ref(), state.assets.as_ref(), &post).await?;

    Ok(Json(MessageResponse::new(format!(
        "\"{}\" has been deleted successfully !",
        post.title
    ))))
}

/// delete_many_posts
///
/// [Authenticated Route] Batch deletion. Authorization is all-or-nothing:
/// admin, or owner of every post in the batch; a single unresolved id rejects
/// the whole batch.
#[utoipa::path(
    delete,
    path = "/api/posts",
    request_body = DeletePostsRequest,
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_many_posts(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeletePostsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;
    let deleted = cascade::delete_many_posts(
        state.repo.as_ref(),
        state.assets.as_ref(),
        &caller,
        &payload.posts_ids,
    )
    .await?;
    Ok(Json(MessageResponse::new(format!(
        "{deleted} posts have been deleted successfully!"
    ))))
}

/// posts_by_author
///
/// [Public Route] An author's posts, newest first, paginated.
#[utoipa::path(
    get,
    path = "/api/posts/user/{id}",
    params(("id" = Uuid, Path, description = "Author ID"), PageQuery),
    responses((status = 200, description = "Posts", body = PagedPosts))
)]
pub async fn posts_by_author(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedPosts>, ApiError> {
    state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let paged = state
        .repo
        .posts_by_author(user_id, query.page(), query.per_page())
        .await?;
    Ok(Json(paged))
}

/// liked_posts
///
/// [Public Route] The posts a user has liked, paginated.
#[utoipa::path(
    get,
    path = "/api/posts/liked/user/{id}",
    params(("id" = Uuid, Path, description = "User ID"), PageQuery),
    responses((status = 200, description = "Posts", body = PagedPosts))
)]
pub async fn liked_posts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedPosts>, ApiError> {
    state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let paged = state
        .repo
        .posts_liked_by(user_id, query.page(), query.per_page())
        .await?;
    Ok(Json(paged))
}

/// latest_posts_by_author
///
/// [Public Route] The latest N posts of an author (readers are not authors,
/// so a reader id resolves to 404 here).
#[utoipa::path(
    get,
    path = "/api/posts/latest/author/{id}",
    params(("id" = Uuid, Path, description = "Author ID"), LimitQuery),
    responses((status = 200, description = "Posts", body = [Post]))
)]
pub async fn latest_posts_by_author(
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let limit = query
        .limit
        .ok_or_else(|| ApiError::invalid("Missing limit variable !"))?;
    let author = state
        .repo
        .get_user(author_id)
        .await?
        .filter(|u| u.role != Role::Reader)
        .ok_or_else(|| ApiError::not_found("Author"))?;
    let posts = state.repo.latest_posts_by_author(author.id, limit).await?;
    Ok(Json(posts))
}
