use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Roles ---

/// Role
///
/// The RBAC field carried by every user record and resolved into the bearer
/// token claims. `Reader` is the registration default; `Author` accounts are
/// created by an admin.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Author,
    #[default]
    Reader,
}

// --- Slug derivation ---

/// Derives a URL-safe slug from a title: lowercased, with every run of
/// non-alphanumeric characters collapsed into a single `-`. Deterministic and
/// case-insensitive, so "Hello World" and "hello world" collide by design.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity row from the `users` table. Internal only: it
/// carries the credential hash and is never serialized to clients — wire
/// output goes through [`UserProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub username: String,
    pub role: Role,
    pub verified: bool,
    // Hosted profile-image asset; `avatar_key` is the opaque asset-host id
    // needed to release the image on account deletion.
    pub avatar_url: Option<String>,
    pub avatar_key: Option<String>,
    pub job: Option<String>,
    pub bio: Option<String>,
    pub address: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// UserProfile
///
/// The wire shape of a user: everything the client may see, never the
/// credential hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub avatar_url: Option<String>,
    pub job: Option<String>,
    pub bio: Option<String>,
    pub address: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        UserProfile {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            verified: u.verified,
            avatar_url: u.avatar_url,
            job: u.job,
            bio: u.bio,
            address: u.address,
            facebook: u.facebook,
            instagram: u.instagram,
            twitter: u.twitter,
            linkedin: u.linkedin,
            created_at: u.created_at,
        }
    }
}

/// Post
///
/// A raw post row. `image_key` is the asset-host identifier for the cover
/// image, kept so deletion can release the hosted asset.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    // Unique, derived from the title at write time.
    pub slug: String,
    pub content: String,
    pub image_url: String,
    pub image_key: Option<String>,
    // Owner reference; must resolve to a user with role author or admin.
    pub author_id: Uuid,
    pub category_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PostView
///
/// A post enriched with its referenced author and category plus the like-set,
/// produced by an explicit query-time join. The referenced fields are
/// `Option` because a category can be deleted without cascading to its posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image_url: String,
    pub author_id: Uuid,
    pub author_username: Option<String>,
    pub author_avatar: Option<String>,
    pub category_id: Uuid,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    // The membership set: each user id appears at most once.
    pub likes: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PostRef
///
/// A minimal reference to a post (previous/next navigation).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PostRef {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

/// Comment
///
/// A raw comment row; the parent post must exist at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CommentView
///
/// A comment joined with its author's display data and the like-set.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub user_avatar: Option<String>,
    pub content: String,
    pub likes: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserCommentView
///
/// A comment as shown on a user's public page: the comment plus the post it
/// was left on.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserCommentView {
    pub id: Uuid,
    pub content: String,
    pub likes: i64,
    pub post_title: Option<String>,
    pub post_slug: Option<String>,
    pub post_author: Option<String>,
}

/// Category
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub icon: Option<String>,
    pub image_url: String,
    pub image_key: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CategoryWithCount
///
/// Category listing item carrying its current post count (recomputed on every
/// read; no caching).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub icon: Option<String>,
    pub image_url: String,
    pub posts: i64,
}

/// NewsletterSubscription
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct NewsletterSubscription {
    pub id: Uuid,
    pub email: String,
    // When false the address stays on the list but receives no new-post mail.
    pub notification: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// VerificationToken
///
/// One-shot token backing both account verification and password reset links.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 25, message = "username must be 2-25 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

/// CreatePostFields
///
/// The text fields of the multipart post-creation request, assembled by the
/// handler before validation. The image arrives as a separate multipart part.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreatePostFields {
    #[validate(length(min = 2, max = 200, message = "title must be 2-200 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "content must be at least 10 characters"))]
    pub content: String,
    pub category: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 200, message = "title must be 2-200 characters"))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10, message = "content must be at least 10 characters"))]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub post_id: Uuid,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

/// CreateCategoryFields
///
/// Text fields of the multipart category-creation request (admin only).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCategoryFields {
    #[validate(length(min = 2, max = 50, message = "title must be 2-50 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "description must be at least 10 characters"))]
    pub description: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 50, message = "title must be 2-50 characters"))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10, message = "description must be at least 10 characters"))]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateAuthorRequest {
    #[validate(length(min = 2, max = 25, message = "username must be 2-25 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 25, message = "username must be 2-25 characters"))]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 50, message = "job must be 2-50 characters"))]
    pub job: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub new_password: String,
    // Optionally change the account email in the same call; uniqueness is
    // re-checked against the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct SubscribeRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

// Batch deletion payloads. Each id must resolve and the caller must be
// authorized for every entity before anything is deleted.

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct DeletePostsRequest {
    #[validate(length(min = 1, message = "No posts to delete !"))]
    pub posts_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct DeleteCommentsRequest {
    #[validate(length(min = 1, message = "No comments to delete !"))]
    pub comments_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct DeleteCategoriesRequest {
    #[validate(length(min = 1, message = "No categories to delete !"))]
    pub categories: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct DeleteSubscriptionsRequest {
    #[validate(length(min = 1, message = "No emails selected !"))]
    pub emails_ids: Vec<Uuid>,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

/// LoginResponse
///
/// The session payload: identity data plus the signed bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub token: String,
}

/// PagedPosts
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PagedPosts {
    pub posts: Vec<PostView>,
    pub total: i64,
}

/// PostDetail
///
/// The single-post page payload: the post plus related posts from the same
/// category and previous/next navigation references.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostDetail {
    pub post: PostView,
    pub related_posts: Vec<PostView>,
    pub prev_post: Option<PostRef>,
    pub next_post: Option<PostRef>,
}

/// LikeResponse
///
/// The updated like-set after a toggle, plus which way the toggle went.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: Vec<Uuid>,
}

/// PagedComments
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PagedComments {
    pub comments: Vec<CommentView>,
    pub total: i64,
}

// --- Dashboard Schemas (Output) ---

/// DashboardStats
///
/// Output schema for the administrative statistics dashboard. All counters
/// are recomputed from the store on every read; `*_last_month` counts rows
/// created in the trailing 30 days.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub posts: i64,
    pub posts_last_month: i64,
    pub users: i64,
    pub authors: i64,
    pub authors_last_month: i64,
    pub readers: i64,
    pub readers_last_month: i64,
    pub comments: i64,
    pub comments_last_month: i64,
    pub subscribers: i64,
}

/// UserOverview
///
/// Admin listing row: a user joined with engagement totals (comment count and
/// likes cast on posts).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserOverview {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub posts: i64,
    pub comments: i64,
    pub post_likes: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// CategoryStat
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CategoryStat {
    pub category: String,
    pub posts: i64,
}

/// CategoryStatsResponse
///
/// Per-category post distribution for the admin dashboard, with the most
/// popular category called out.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryStatsResponse {
    pub stats: Vec<CategoryStat>,
    pub popular: Option<CategoryStat>,
}

/// AuthorStats
///
/// The author dashboard: the caller's post/comment volume and the engagement
/// their content has received.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthorStats {
    pub posts: i64,
    pub posts_last_month: i64,
    // Likes received across the author's posts.
    pub post_likes: i64,
    // Comments left on the author's posts.
    pub comments_on_posts: i64,
    pub comments_on_posts_last_month: i64,
    // Likes received across the author's own comments.
    pub comment_likes: i64,
}

/// AuthorCategoryStats
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthorCategoryStats {
    pub categories: Vec<CategoryStat>,
    pub top_category: Option<CategoryStat>,
}

/// RoleCount
///
/// Headcount for a role, with the trailing-30-day delta.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleCount {
    pub total: i64,
    pub last_month: i64,
}
