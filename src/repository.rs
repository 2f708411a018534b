use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    Category, CategoryStat, CategoryWithCount, Comment, CommentView, LikeResponse,
    NewsletterSubscription, PagedComments, PagedPosts, Post, PostRef, PostView, Role,
    UpdateProfileRequest, User, UserCommentView, UserOverview, VerificationToken,
};

// --- Repository Input Contracts ---

/// NewUser
///
/// Everything the store needs to mint a user row. The credential hash is
/// computed by the caller; the repository never sees a plaintext password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub verified: bool,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image_url: String,
    pub image_key: Option<String>,
    pub author_id: Uuid,
    pub category_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub icon: Option<String>,
    pub image_url: String,
    pub image_key: Option<String>,
}

/// Partial update for a post. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
}

/// Partial update for a category.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Repository Trait
///
/// The abstract contract for all persistence operations, letting handlers and
/// the cascade coordinator interact with the data layer without knowing the
/// concrete implementation (Postgres in production, in-memory in tests).
///
/// Every method maps to a single store round-trip (or a short fixed sequence
/// of per-row atomic statements); cross-entity cascades are composed above
/// this layer and are deliberately not transactional.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    async fn find_admin(&self) -> Result<Option<User>, ApiError>;
    /// Admin listing, optionally restricted to one role, enriched with
    /// per-user engagement totals.
    async fn list_user_overviews(&self, role: Option<Role>) -> Result<Vec<UserOverview>, ApiError>;
    async fn count_users_by_role(
        &self,
        role: Role,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, ApiError>;
    async fn update_profile(
        &self,
        id: Uuid,
        patch: &UpdateProfileRequest,
    ) -> Result<Option<User>, ApiError>;
    /// Replaces the credential hash and, when requested, the account email.
    async fn update_credentials(
        &self,
        id: Uuid,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<bool, ApiError>;
    async fn set_user_avatar(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError>;
    async fn set_user_verified(&self, id: Uuid) -> Result<bool, ApiError>;
    async fn delete_user_row(&self, id: Uuid) -> Result<bool, ApiError>;

    // --- Verification tokens ---
    async fn create_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<VerificationToken, ApiError>;
    async fn find_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<VerificationToken>, ApiError>;
    async fn find_token_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<VerificationToken>, ApiError>;
    async fn delete_verification_tokens(&self, user_id: Uuid) -> Result<u64, ApiError>;

    // --- Posts ---
    async fn create_post(&self, post: NewPost) -> Result<Post, ApiError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, ApiError>;
    async fn get_posts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, ApiError>;
    async fn posts_owned_by(&self, user_id: Uuid) -> Result<Vec<Post>, ApiError>;
    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, ApiError>;
    async fn get_post_view_by_slug(&self, slug: &str) -> Result<Option<PostView>, ApiError>;
    async fn list_posts(
        &self,
        category: Option<Uuid>,
        search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError>;
    async fn posts_by_author(
        &self,
        author_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError>;
    async fn posts_liked_by(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError>;
    async fn latest_posts_by_author(
        &self,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Post>, ApiError>;
    async fn related_posts(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<PostView>, ApiError>;
    /// Previous/next navigation around a creation timestamp.
    async fn neighbor_posts(
        &self,
        created_at: DateTime<Utc>,
    ) -> Result<(Option<PostRef>, Option<PostRef>), ApiError>;
    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>, ApiError>;
    async fn set_post_image(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError>;
    /// Toggle semantics: removes the membership if present, adds it
    /// otherwise. Duplicates can never result.
    async fn toggle_post_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeResponse, ApiError>;
    async fn count_posts(
        &self,
        author: Option<Uuid>,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, ApiError>;
    /// Likes received across all posts of one author.
    async fn author_post_like_total(&self, author_id: Uuid) -> Result<i64, ApiError>;
    async fn category_post_stats(&self) -> Result<Vec<CategoryStat>, ApiError>;
    async fn author_category_stats(&self, author_id: Uuid) -> Result<Vec<CategoryStat>, ApiError>;
    async fn delete_posts(&self, ids: &[Uuid]) -> Result<u64, ApiError>;

    // --- Comments ---
    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<CommentView, ApiError>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, ApiError>;
    async fn get_comments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Comment>, ApiError>;
    async fn comments_by_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, ApiError>;
    async fn comments_by_user(&self, user_id: Uuid) -> Result<Vec<UserCommentView>, ApiError>;
    async fn all_comments(&self) -> Result<Vec<CommentView>, ApiError>;
    async fn comments_liked_by(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedComments, ApiError>;
    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, ApiError>;
    async fn toggle_comment_like(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeResponse, ApiError>;
    async fn count_comments(&self, since: Option<DateTime<Utc>>) -> Result<i64, ApiError>;
    async fn count_comments_by_post(&self, post_id: Uuid) -> Result<i64, ApiError>;
    /// Comments left on any of the author's posts.
    async fn count_comments_on_author_posts(
        &self,
        author_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, ApiError>;
    /// Likes received across one user's comments.
    async fn comment_like_total(&self, user_id: Uuid) -> Result<i64, ApiError>;
    async fn delete_comments(&self, ids: &[Uuid]) -> Result<u64, ApiError>;
    async fn delete_comments_by_post(&self, post_id: Uuid) -> Result<u64, ApiError>;
    async fn delete_comments_by_user(&self, user_id: Uuid) -> Result<u64, ApiError>;

    // --- Categories ---
    async fn create_category(&self, category: NewCategory) -> Result<Category, ApiError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, ApiError>;
    async fn get_categories_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, ApiError>;
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, ApiError>;
    async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, ApiError>;
    async fn update_category(
        &self,
        id: Uuid,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, ApiError>;
    async fn set_category_image(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError>;
    async fn delete_categories(&self, ids: &[Uuid]) -> Result<u64, ApiError>;

    // --- Newsletter ---
    async fn subscribe(&self, email: &str) -> Result<NewsletterSubscription, ApiError>;
    async fn find_subscription(
        &self,
        email: &str,
    ) -> Result<Option<NewsletterSubscription>, ApiError>;
    async fn get_subscription(&self, id: Uuid)
    -> Result<Option<NewsletterSubscription>, ApiError>;
    async fn get_subscriptions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<NewsletterSubscription>, ApiError>;
    async fn list_subscriptions(&self) -> Result<Vec<NewsletterSubscription>, ApiError>;
    /// Addresses with notifications enabled, for new-post mail.
    async fn notified_emails(&self) -> Result<Vec<String>, ApiError>;
    async fn set_subscription_notification(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<Option<NewsletterSubscription>, ApiError>;
    async fn delete_subscriptions(&self, ids: &[Uuid]) -> Result<u64, ApiError>;
    async fn count_subscriptions(&self) -> Result<i64, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by
/// PostgreSQL. Join expansion of references (author, category, like-sets) is
/// done explicitly at query time.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Shared select fragments. The enriched post/comment views join the
// referenced user and category rows (LEFT, so a dangling category reference
// degrades to NULL fields) and aggregate the like-set into a uuid array.

const POST_VIEW_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.content, p.image_url,
           p.author_id, u.username AS author_username, u.avatar_url AS author_avatar,
           p.category_id, c.title AS category_title, c.slug AS category_slug,
           COALESCE(l.likes, ARRAY[]::uuid[]) AS likes,
           p.created_at, p.updated_at
      FROM posts p
      LEFT JOIN users u ON u.id = p.author_id
      LEFT JOIN categories c ON c.id = p.category_id
      LEFT JOIN (SELECT post_id, array_agg(user_id) AS likes
                   FROM post_likes GROUP BY post_id) l ON l.post_id = p.id
"#;

const COMMENT_VIEW_SELECT: &str = r#"
    SELECT co.id, co.post_id, co.user_id,
           u.username, u.avatar_url AS user_avatar, co.content,
           COALESCE(l.likes, ARRAY[]::uuid[]) AS likes,
           co.created_at
      FROM comments co
      LEFT JOIN users u ON u.id = co.user_id
      LEFT JOIN (SELECT comment_id, array_agg(user_id) AS likes
                   FROM comment_likes GROUP BY comment_id) l ON l.comment_id = co.id
"#;

const USER_SELECT: &str = r#"
    SELECT id, email, password_hash, username, role, verified,
           avatar_url, avatar_key, job, bio, address,
           facebook, instagram, twitter, linkedin,
           created_at, updated_at
      FROM users
"#;

#[async_trait]
impl Repository for PostgresRepository {
    // --- Users ---

    async fn create_user(&self, user: NewUser) -> Result<User, ApiError> {
        let row = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, password_hash, username, role, verified)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, email, password_hash, username, role, verified,
                         avatar_url, avatar_key, job, bio, address,
                         facebook, instagram, twitter, linkedin,
                         created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.username)
        .bind(user.role)
        .bind(user.verified)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_admin(&self) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE role = 'admin' ORDER BY created_at ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_user_overviews(&self, role: Option<Role>) -> Result<Vec<UserOverview>, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT u.id, u.username, u.email, u.role, u.verified, u.avatar_url, u.bio,
                   (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id) AS posts,
                   (SELECT COUNT(*) FROM comments c WHERE c.user_id = u.id) AS comments,
                   (SELECT COUNT(*) FROM post_likes pl WHERE pl.user_id = u.id) AS post_likes,
                   u.created_at
              FROM users u
            "#,
        );
        if let Some(role) = role {
            builder.push(" WHERE u.role = ");
            builder.push_bind(role);
        }
        builder.push(" ORDER BY u.created_at DESC");
        let rows = builder
            .build_query_as::<UserOverview>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_users_by_role(
        &self,
        role: Role,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE role = ");
        builder.push_bind(role);
        if let Some(since) = since {
            builder.push(" AND created_at >= ");
            builder.push_bind(since);
        }
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: &UpdateProfileRequest,
    ) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, User>(
            r#"UPDATE users
                  SET username  = COALESCE($2, username),
                      job       = COALESCE($3, job),
                      bio       = COALESCE($4, bio),
                      address   = COALESCE($5, address),
                      facebook  = COALESCE($6, facebook),
                      instagram = COALESCE($7, instagram),
                      twitter   = COALESCE($8, twitter),
                      linkedin  = COALESCE($9, linkedin),
                      updated_at = NOW()
                WHERE id = $1
               RETURNING id, email, password_hash, username, role, verified,
                         avatar_url, avatar_key, job, bio, address,
                         facebook, instagram, twitter, linkedin,
                         created_at, updated_at"#,
        )
        .bind(id)
        .bind(&patch.username)
        .bind(&patch.job)
        .bind(&patch.bio)
        .bind(&patch.address)
        .bind(&patch.facebook)
        .bind(&patch.instagram)
        .bind(&patch.twitter)
        .bind(&patch.linkedin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"UPDATE users
                  SET password_hash = $2, email = COALESCE($3, email), updated_at = NOW()
                WHERE id = $1"#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_avatar(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE users SET avatar_url = $2, avatar_key = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_verified(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("UPDATE users SET verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_row(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Verification tokens ---

    async fn create_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<VerificationToken, ApiError> {
        let row = sqlx::query_as::<_, VerificationToken>(
            r#"INSERT INTO verification_tokens (user_id, token)
               VALUES ($1, $2)
               RETURNING user_id, token, created_at"#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<VerificationToken>, ApiError> {
        let row = sqlx::query_as::<_, VerificationToken>(
            "SELECT user_id, token, created_at FROM verification_tokens WHERE user_id = $1 AND token = $2",
        )
        .bind(user_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_token_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<VerificationToken>, ApiError> {
        let row = sqlx::query_as::<_, VerificationToken>(
            "SELECT user_id, token, created_at FROM verification_tokens WHERE user_id = $1 LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_verification_tokens(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // --- Posts ---

    async fn create_post(&self, post: NewPost) -> Result<Post, ApiError> {
        let row = sqlx::query_as::<_, Post>(
            r#"INSERT INTO posts (id, title, slug, content, image_url, image_key, author_id, category_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id, title, slug, content, image_url, image_key,
                         author_id, category_id, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(&post.image_key)
        .bind(post.author_id)
        .bind(post.category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, ApiError> {
        let row = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_posts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, ApiError> {
        let rows = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn posts_owned_by(&self, user_id: Uuid) -> Result<Vec<Post>, ApiError> {
        let rows = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE author_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, ApiError> {
        let row = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_post_view_by_slug(&self, slug: &str) -> Result<Option<PostView>, ApiError> {
        let row = sqlx::query_as::<_, PostView>(&format!("{POST_VIEW_SELECT} WHERE p.slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_posts(
        &self,
        category: Option<Uuid>,
        search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(POST_VIEW_SELECT);
        builder.push(" WHERE TRUE ");
        if let Some(category) = category {
            builder.push(" AND p.category_id = ");
            builder.push_bind(category);
        }
        if let Some(search) = &search {
            // Case-insensitive search across title and content.
            let pattern = format!("%{search}%");
            builder.push(" AND (p.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.content ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY p.created_at DESC LIMIT ");
        builder.push_bind(per_page);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1).max(0) * per_page);

        let posts = builder
            .build_query_as::<PostView>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE TRUE ");
        if let Some(category) = category {
            count_builder.push(" AND p.category_id = ");
            count_builder.push_bind(category);
        }
        if let Some(search) = &search {
            let pattern = format!("%{search}%");
            count_builder.push(" AND (p.title ILIKE ");
            count_builder.push_bind(pattern.clone());
            count_builder.push(" OR p.content ILIKE ");
            count_builder.push_bind(pattern);
            count_builder.push(")");
        }
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok(PagedPosts { posts, total })
    }

    async fn posts_by_author(
        &self,
        author_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError> {
        let posts = sqlx::query_as::<_, PostView>(&format!(
            "{POST_VIEW_SELECT} WHERE p.author_id = $1 ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(author_id)
        .bind(per_page)
        .bind((page - 1).max(0) * per_page)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(PagedPosts { posts, total })
    }

    async fn posts_liked_by(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError> {
        let posts = sqlx::query_as::<_, PostView>(&format!(
            r#"{POST_VIEW_SELECT}
               WHERE p.id IN (SELECT post_id FROM post_likes WHERE user_id = $1)
               ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"#
        ))
        .bind(user_id)
        .bind(per_page)
        .bind((page - 1).max(0) * per_page)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(PagedPosts { posts, total })
    }

    async fn latest_posts_by_author(
        &self,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Post>, ApiError> {
        let rows = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE author_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn related_posts(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<PostView>, ApiError> {
        let rows = sqlx::query_as::<_, PostView>(&format!(
            r#"{POST_VIEW_SELECT}
               WHERE p.category_id = $1 AND p.id <> $2
               ORDER BY p.created_at DESC LIMIT $3"#
        ))
        .bind(category_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn neighbor_posts(
        &self,
        created_at: DateTime<Utc>,
    ) -> Result<(Option<PostRef>, Option<PostRef>), ApiError> {
        let prev = sqlx::query_as::<_, PostRef>(
            "SELECT id, title, slug FROM posts WHERE created_at < $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(created_at)
        .fetch_optional(&self.pool)
        .await?;
        let next = sqlx::query_as::<_, PostRef>(
            "SELECT id, title, slug FROM posts WHERE created_at > $1 ORDER BY created_at ASC LIMIT 1",
        )
        .bind(created_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok((prev, next))
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>, ApiError> {
        let row = sqlx::query_as::<_, Post>(
            r#"UPDATE posts
                  SET title       = COALESCE($2, title),
                      slug        = COALESCE($3, slug),
                      content     = COALESCE($4, content),
                      category_id = COALESCE($5, category_id),
                      updated_at  = NOW()
                WHERE id = $1
               RETURNING id, title, slug, content, image_url, image_key,
                         author_id, category_id, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.slug)
        .bind(&patch.content)
        .bind(patch.category_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_post_image(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE posts SET image_url = $2, image_key = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_post_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeResponse, ApiError> {
        // Each branch is a single atomic statement; the composite primary key
        // guarantees a user appears at most once per post.
        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;
        if !removed {
            sqlx::query(
                "INSERT INTO post_likes (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        }
        let likes: Vec<Uuid> = sqlx::query_scalar("SELECT user_id FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(LikeResponse {
            liked: !removed,
            likes,
        })
    }

    async fn count_posts(
        &self,
        author: Option<Uuid>,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts WHERE TRUE ");
        if let Some(author) = author {
            builder.push(" AND author_id = ");
            builder.push_bind(author);
        }
        if let Some(since) = since {
            builder.push(" AND created_at >= ");
            builder.push_bind(since);
        }
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn author_post_like_total(&self, author_id: Uuid) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM post_likes pl
               JOIN posts p ON p.id = pl.post_id
               WHERE p.author_id = $1"#,
        )
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn category_post_stats(&self) -> Result<Vec<CategoryStat>, ApiError> {
        let rows = sqlx::query_as::<_, CategoryStat>(
            r#"SELECT c.title AS category, COUNT(p.id) AS posts
                 FROM categories c
                 LEFT JOIN posts p ON p.category_id = c.id
                GROUP BY c.id, c.title
                ORDER BY posts DESC, c.created_at ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn author_category_stats(&self, author_id: Uuid) -> Result<Vec<CategoryStat>, ApiError> {
        let rows = sqlx::query_as::<_, CategoryStat>(
            r#"SELECT c.title AS category, COUNT(p.id) AS posts
                 FROM categories c
                 LEFT JOIN posts p ON p.category_id = c.id AND p.author_id = $1
                GROUP BY c.id, c.title
                ORDER BY posts DESC, c.created_at ASC"#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_posts(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // --- Comments ---

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<CommentView, ApiError> {
        // Insert, then immediately return the enriched view (author join).
        let id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO comments (id, post_id, user_id, content)
               VALUES ($1, $2, $3, $4) RETURNING id"#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        let view = sqlx::query_as::<_, CommentView>(&format!("{COMMENT_VIEW_SELECT} WHERE co.id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(view)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, ApiError> {
        let row = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_comments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Comment>, ApiError> {
        let rows = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn comments_by_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, ApiError> {
        let rows = sqlx::query_as::<_, CommentView>(&format!(
            "{COMMENT_VIEW_SELECT} WHERE co.post_id = $1 ORDER BY co.created_at ASC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn comments_by_user(&self, user_id: Uuid) -> Result<Vec<UserCommentView>, ApiError> {
        let rows = sqlx::query_as::<_, UserCommentView>(
            r#"SELECT co.id, co.content,
                      (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = co.id) AS likes,
                      p.title AS post_title, p.slug AS post_slug, au.username AS post_author
                 FROM comments co
                 LEFT JOIN posts p ON p.id = co.post_id
                 LEFT JOIN users au ON au.id = p.author_id
                WHERE co.user_id = $1
                ORDER BY co.created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn all_comments(&self) -> Result<Vec<CommentView>, ApiError> {
        let rows = sqlx::query_as::<_, CommentView>(&format!(
            "{COMMENT_VIEW_SELECT} ORDER BY co.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn comments_liked_by(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedComments, ApiError> {
        let comments = sqlx::query_as::<_, CommentView>(&format!(
            r#"{COMMENT_VIEW_SELECT}
               WHERE co.id IN (SELECT comment_id FROM comment_likes WHERE user_id = $1)
               ORDER BY co.created_at DESC LIMIT $2 OFFSET $3"#
        ))
        .bind(user_id)
        .bind(per_page)
        .bind((page - 1).max(0) * per_page)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM comment_likes WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(PagedComments { comments, total })
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, ApiError> {
        let row = sqlx::query_as::<_, Comment>(
            r#"UPDATE comments SET content = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING id, post_id, user_id, content, created_at, updated_at"#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn toggle_comment_like(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeResponse, ApiError> {
        let removed =
            sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
                .bind(comment_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?
                .rows_affected()
                > 0;
        if !removed {
            sqlx::query(
                "INSERT INTO comment_likes (user_id, comment_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        }
        let likes: Vec<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM comment_likes WHERE comment_id = $1")
                .bind(comment_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(LikeResponse {
            liked: !removed,
            likes,
        })
    }

    async fn count_comments(&self, since: Option<DateTime<Utc>>) -> Result<i64, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM comments WHERE TRUE ");
        if let Some(since) = since {
            builder.push(" AND created_at >= ");
            builder.push_bind(since);
        }
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn count_comments_by_post(&self, post_id: Uuid) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_comments_on_author_posts(
        &self,
        author_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM comments co JOIN posts p ON p.id = co.post_id WHERE p.author_id = ",
        );
        builder.push_bind(author_id);
        if let Some(since) = since {
            builder.push(" AND co.created_at >= ");
            builder.push_bind(since);
        }
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn comment_like_total(&self, user_id: Uuid) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM comment_likes cl
               JOIN comments co ON co.id = cl.comment_id
               WHERE co.user_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete_comments(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_comments_by_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM comments WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // --- Categories ---

    async fn create_category(&self, category: NewCategory) -> Result<Category, ApiError> {
        let row = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (id, title, slug, description, icon, image_url, image_key)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, title, slug, description, icon, image_url, image_key,
                         created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(&category.title)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.icon)
        .bind(&category.image_url)
        .bind(&category.image_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, ApiError> {
        let row = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_categories_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, ApiError> {
        let rows = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, ApiError> {
        let row = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, ApiError> {
        let rows = sqlx::query_as::<_, CategoryWithCount>(
            r#"SELECT c.id, c.title, c.slug, c.description, c.icon, c.image_url,
                      (SELECT COUNT(*) FROM posts p WHERE p.category_id = c.id) AS posts
                 FROM categories c
                ORDER BY c.created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_category(
        &self,
        id: Uuid,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, ApiError> {
        let row = sqlx::query_as::<_, Category>(
            r#"UPDATE categories
                  SET title       = COALESCE($2, title),
                      slug        = COALESCE($3, slug),
                      description = COALESCE($4, description),
                      icon        = COALESCE($5, icon),
                      updated_at  = NOW()
                WHERE id = $1
               RETURNING id, title, slug, description, icon, image_url, image_key,
                         created_at, updated_at"#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.slug)
        .bind(&patch.description)
        .bind(&patch.icon)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_category_image(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE categories SET image_url = $2, image_key = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_categories(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // --- Newsletter ---

    async fn subscribe(&self, email: &str) -> Result<NewsletterSubscription, ApiError> {
        let row = sqlx::query_as::<_, NewsletterSubscription>(
            r#"INSERT INTO newsletter_subscriptions (id, email)
               VALUES ($1, $2)
               RETURNING id, email, notification, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_subscription(
        &self,
        email: &str,
    ) -> Result<Option<NewsletterSubscription>, ApiError> {
        let row = sqlx::query_as::<_, NewsletterSubscription>(
            "SELECT id, email, notification, created_at FROM newsletter_subscriptions WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_subscription(
        &self,
        id: Uuid,
    ) -> Result<Option<NewsletterSubscription>, ApiError> {
        let row = sqlx::query_as::<_, NewsletterSubscription>(
            "SELECT id, email, notification, created_at FROM newsletter_subscriptions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_subscriptions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<NewsletterSubscription>, ApiError> {
        let rows = sqlx::query_as::<_, NewsletterSubscription>(
            "SELECT id, email, notification, created_at FROM newsletter_subscriptions WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_subscriptions(&self) -> Result<Vec<NewsletterSubscription>, ApiError> {
        let rows = sqlx::query_as::<_, NewsletterSubscription>(
            "SELECT id, email, notification, created_at FROM newsletter_subscriptions ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn notified_emails(&self) -> Result<Vec<String>, ApiError> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT email FROM newsletter_subscriptions WHERE notification = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn set_subscription_notification(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<Option<NewsletterSubscription>, ApiError> {
        let row = sqlx::query_as::<_, NewsletterSubscription>(
            r#"UPDATE newsletter_subscriptions SET notification = $2
               WHERE id = $1
               RETURNING id, email, notification, created_at"#,
        )
        .bind(id)
        .bind(enabled)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_subscriptions(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM newsletter_subscriptions WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_subscriptions(&self) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM newsletter_subscriptions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
