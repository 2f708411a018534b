//! Shared test fixtures: an in-memory `Repository` implementation plus
//! helpers for assembling an `AppState` out of mock collaborators, so handler
//! and cascade behavior can be exercised without a database, an asset host or
//! an SMTP relay.

use async_trait::async_trait;
use axum::extract::Multipart;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use inkpress::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    error::ApiError,
    models::{
        Category, CategoryStat, CategoryWithCount, Comment, CommentView, LikeResponse,
        NewsletterSubscription, PagedComments, PagedPosts, Post, PostRef, PostView, Role,
        UpdateProfileRequest, User, UserCommentView, UserOverview, VerificationToken,
    },
    repository::{CategoryPatch, NewCategory, NewPost, NewUser, PostPatch, Repository},
    email::MockMailer,
    storage::MockAssetHost,
};

#[derive(Default)]
struct Store {
    users: Vec<User>,
    tokens: Vec<VerificationToken>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    categories: Vec<Category>,
    subscriptions: Vec<NewsletterSubscription>,
    // (user_id, entity_id) membership pairs.
    post_likes: Vec<(Uuid, Uuid)>,
    comment_likes: Vec<(Uuid, Uuid)>,
}

/// In-memory repository with the same observable semantics as the Postgres
/// implementation for everything the tests exercise.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
}

fn paged<T: Clone>(items: &[T], page: i64, per_page: i64) -> Vec<T> {
    let start = ((page - 1).max(0) * per_page) as usize;
    items
        .iter()
        .skip(start)
        .take(per_page as usize)
        .cloned()
        .collect()
}

fn post_view(store: &Store, p: &Post) -> PostView {
    let author = store.users.iter().find(|u| u.id == p.author_id);
    let category = store.categories.iter().find(|c| c.id == p.category_id);
    PostView {
        id: p.id,
        title: p.title.clone(),
        slug: p.slug.clone(),
        content: p.content.clone(),
        image_url: p.image_url.clone(),
        author_id: p.author_id,
        author_username: author.map(|u| u.username.clone()),
        author_avatar: author.and_then(|u| u.avatar_url.clone()),
        category_id: p.category_id,
        category_title: category.map(|c| c.title.clone()),
        category_slug: category.map(|c| c.slug.clone()),
        likes: store
            .post_likes
            .iter()
            .filter(|(_, pid)| *pid == p.id)
            .map(|(uid, _)| *uid)
            .collect(),
        created_at: p.created_at,
        updated_at: p.updated_at,
    }
}

fn comment_view(store: &Store, c: &Comment) -> CommentView {
    let author = store.users.iter().find(|u| u.id == c.user_id);
    CommentView {
        id: c.id,
        post_id: c.post_id,
        user_id: c.user_id,
        username: author.map(|u| u.username.clone()),
        user_avatar: author.and_then(|u| u.avatar_url.clone()),
        content: c.content.clone(),
        likes: store
            .comment_likes
            .iter()
            .filter(|(_, cid)| *cid == c.id)
            .map(|(uid, _)| *uid)
            .collect(),
        created_at: c.created_at,
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Seed helpers (direct store access, bypassing the trait) ---

    pub fn seed_user(&self, username: &str, role: Role, verified: bool) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{username}@example.com"),
            // A real Argon2 hash of "password123", so login-path tests can
            // exercise verification against seeded users.
            password_hash: inkpress::auth::hash_password("password123").unwrap(),
            username: username.to_string(),
            role,
            verified,
            avatar_url: None,
            avatar_key: None,
            job: None,
            bio: None,
            address: None,
            facebook: None,
            instagram: None,
            twitter: None,
            linkedin: None,
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn seed_avatar(&self, user_id: Uuid, key: &str) {
        let mut store = self.store.lock().unwrap();
        if let Some(user) = store.users.iter_mut().find(|u| u.id == user_id) {
            user.avatar_url = Some(format!("http://assets.test/{key}"));
            user.avatar_key = Some(key.to_string());
        }
    }

    pub fn seed_category(&self, title: &str) -> Category {
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: inkpress::models::slugify(title),
            description: format!("Posts about {title}"),
            icon: None,
            image_url: format!("http://assets.test/categories/{title}.jpg"),
            image_key: Some(format!("categories/{title}.jpg")),
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().categories.push(category.clone());
        category
    }

    pub fn seed_post(&self, author: &User, category: &Category, title: &str) -> Post {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: inkpress::models::slugify(title),
            content: "Lorem ipsum dolor sit amet".to_string(),
            image_url: format!("http://assets.test/posts/{title}.jpg"),
            image_key: Some(format!("posts/{title}.jpg")),
            author_id: author.id,
            category_id: category.id,
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().posts.push(post.clone());
        post
    }

    pub fn seed_comment(&self, post: &Post, user: &User, content: &str) -> Comment {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: post.id,
            user_id: user.id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().comments.push(comment.clone());
        comment
    }

    pub fn post_count(&self) -> usize {
        self.store.lock().unwrap().posts.len()
    }

    pub fn category_count(&self) -> usize {
        self.store.lock().unwrap().categories.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- Users ---

    async fn create_user(&self, user: NewUser) -> Result<User, ApiError> {
        let now = Utc::now();
        let row = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            username: user.username,
            role: user.role,
            verified: user.verified,
            avatar_url: None,
            avatar_key: None,
            job: None,
            bio: None,
            address: None,
            facebook: None,
            instagram: None,
            twitter: None,
            linkedin: None,
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().users.push(row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_admin(&self) -> Result<Option<User>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.role == Role::Admin).cloned())
    }

    async fn list_user_overviews(&self, role: Option<Role>) -> Result<Vec<UserOverview>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .map(|u| UserOverview {
                id: u.id,
                username: u.username.clone(),
                email: u.email.clone(),
                role: u.role,
                verified: u.verified,
                avatar_url: u.avatar_url.clone(),
                bio: u.bio.clone(),
                posts: store.posts.iter().filter(|p| p.author_id == u.id).count() as i64,
                comments: store.comments.iter().filter(|c| c.user_id == u.id).count() as i64,
                post_likes: store.post_likes.iter().filter(|(uid, _)| *uid == u.id).count()
                    as i64,
                created_at: u.created_at,
            })
            .collect())
    }

    async fn count_users_by_role(
        &self,
        role: Role,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .filter(|u| u.role == role && since.is_none_or(|s| u.created_at >= s))
            .count() as i64)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: &UpdateProfileRequest,
    ) -> Result<Option<User>, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(user) = store.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.username {
            user.username = v.clone();
        }
        if patch.job.is_some() {
            user.job = patch.job.clone();
        }
        if patch.bio.is_some() {
            user.bio = patch.bio.clone();
        }
        if patch.address.is_some() {
            user.address = patch.address.clone();
        }
        if patch.facebook.is_some() {
            user.facebook = patch.facebook.clone();
        }
        if patch.instagram.is_some() {
            user.instagram = patch.instagram.clone();
        }
        if patch.twitter.is_some() {
            user.twitter = patch.twitter.clone();
        }
        if patch.linkedin.is_some() {
            user.linkedin = patch.linkedin.clone();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<bool, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(user) = store.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        if let Some(email) = email {
            user.email = email.to_string();
        }
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_user_avatar(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(user) = store.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.avatar_url = Some(url.to_string());
        user.avatar_key = Some(key.to_string());
        Ok(true)
    }

    async fn set_user_verified(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(user) = store.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.verified = true;
        Ok(true)
    }

    async fn delete_user_row(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut store = self.store.lock().unwrap();
        let before = store.users.len();
        store.users.retain(|u| u.id != id);
        store.post_likes.retain(|(uid, _)| *uid != id);
        store.comment_likes.retain(|(uid, _)| *uid != id);
        Ok(store.users.len() < before)
    }

    // --- Verification tokens ---

    async fn create_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<VerificationToken, ApiError> {
        let row = VerificationToken {
            user_id,
            token: token.to_string(),
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().tokens.push(row.clone());
        Ok(row)
    }

    async fn find_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<VerificationToken>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .tokens
            .iter()
            .find(|t| t.user_id == user_id && t.token == token)
            .cloned())
    }

    async fn find_token_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<VerificationToken>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.tokens.iter().find(|t| t.user_id == user_id).cloned())
    }

    async fn delete_verification_tokens(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let mut store = self.store.lock().unwrap();
        let before = store.tokens.len();
        store.tokens.retain(|t| t.user_id != user_id);
        Ok((before - store.tokens.len()) as u64)
    }

    // --- Posts ---

    async fn create_post(&self, post: NewPost) -> Result<Post, ApiError> {
        let now = Utc::now();
        let row = Post {
            id: Uuid::new_v4(),
            title: post.title,
            slug: post.slug,
            content: post.content,
            image_url: post.image_url,
            image_key: post.image_key,
            author_id: post.author_id,
            category_id: post.category_id,
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().posts.push(row.clone());
        Ok(row)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_posts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn posts_owned_by(&self, user_id: Uuid) -> Result<Vec<Post>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .filter(|p| p.author_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn get_post_view_by_slug(&self, slug: &str) -> Result<Option<PostView>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .map(|p| post_view(&store, p)))
    }

    async fn list_posts(
        &self,
        category: Option<Uuid>,
        search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError> {
        let store = self.store.lock().unwrap();
        let needle = search.map(|s| s.to_lowercase());
        let mut matched: Vec<&Post> = store
            .posts
            .iter()
            .filter(|p| category.is_none_or(|c| p.category_id == c))
            .filter(|p| {
                needle.as_ref().is_none_or(|n| {
                    p.title.to_lowercase().contains(n) || p.content.to_lowercase().contains(n)
                })
            })
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as i64;
        let views: Vec<PostView> = matched.iter().map(|p| post_view(&store, p)).collect();
        Ok(PagedPosts {
            posts: paged(&views, page, per_page),
            total,
        })
    }

    async fn posts_by_author(
        &self,
        author_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError> {
        let store = self.store.lock().unwrap();
        let views: Vec<PostView> = store
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .map(|p| post_view(&store, p))
            .collect();
        let total = views.len() as i64;
        Ok(PagedPosts {
            posts: paged(&views, page, per_page),
            total,
        })
    }

    async fn posts_liked_by(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedPosts, ApiError> {
        let store = self.store.lock().unwrap();
        let liked: Vec<Uuid> = store
            .post_likes
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .map(|(_, pid)| *pid)
            .collect();
        let views: Vec<PostView> = store
            .posts
            .iter()
            .filter(|p| liked.contains(&p.id))
            .map(|p| post_view(&store, p))
            .collect();
        let total = views.len() as i64;
        Ok(PagedPosts {
            posts: paged(&views, page, per_page),
            total,
        })
    }

    async fn latest_posts_by_author(
        &self,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Post>, ApiError> {
        let store = self.store.lock().unwrap();
        let mut posts: Vec<Post> = store
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }

    async fn related_posts(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<PostView>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .filter(|p| p.category_id == category_id && p.id != exclude)
            .take(limit.max(0) as usize)
            .map(|p| post_view(&store, p))
            .collect())
    }

    async fn neighbor_posts(
        &self,
        created_at: DateTime<Utc>,
    ) -> Result<(Option<PostRef>, Option<PostRef>), ApiError> {
        let store = self.store.lock().unwrap();
        let prev = store
            .posts
            .iter()
            .filter(|p| p.created_at < created_at)
            .max_by_key(|p| p.created_at)
            .map(|p| PostRef {
                id: p.id,
                title: p.title.clone(),
                slug: p.slug.clone(),
            });
        let next = store
            .posts
            .iter()
            .filter(|p| p.created_at > created_at)
            .min_by_key(|p| p.created_at)
            .map(|p| PostRef {
                id: p.id,
                title: p.title.clone(),
                slug: p.slug.clone(),
            });
        Ok((prev, next))
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = patch.title {
            post.title = v;
        }
        if let Some(v) = patch.slug {
            post.slug = v;
        }
        if let Some(v) = patch.content {
            post.content = v;
        }
        if let Some(v) = patch.category_id {
            post.category_id = v;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn set_post_image(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        post.image_url = url.to_string();
        post.image_key = Some(key.to_string());
        Ok(true)
    }

    async fn toggle_post_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeResponse, ApiError> {
        let mut store = self.store.lock().unwrap();
        let before = store.post_likes.len();
        store
            .post_likes
            .retain(|(uid, pid)| !(*uid == user_id && *pid == post_id));
        let removed = store.post_likes.len() < before;
        if !removed {
            store.post_likes.push((user_id, post_id));
        }
        let likes = store
            .post_likes
            .iter()
            .filter(|(_, pid)| *pid == post_id)
            .map(|(uid, _)| *uid)
            .collect();
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
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .filter(|p| author.is_none_or(|a| p.author_id == a))
            .filter(|p| since.is_none_or(|s| p.created_at >= s))
            .count() as i64)
    }

    async fn author_post_like_total(&self, author_id: Uuid) -> Result<i64, ApiError> {
        let store = self.store.lock().unwrap();
        let owned: Vec<Uuid> = store
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .map(|p| p.id)
            .collect();
        Ok(store
            .post_likes
            .iter()
            .filter(|(_, pid)| owned.contains(pid))
            .count() as i64)
    }

    async fn category_post_stats(&self) -> Result<Vec<CategoryStat>, ApiError> {
        let store = self.store.lock().unwrap();
        let mut stats: Vec<CategoryStat> = store
            .categories
            .iter()
            .map(|c| CategoryStat {
                category: c.title.clone(),
                posts: store.posts.iter().filter(|p| p.category_id == c.id).count() as i64,
            })
            .collect();
        stats.sort_by(|a, b| b.posts.cmp(&a.posts));
        Ok(stats)
    }

    async fn author_category_stats(&self, author_id: Uuid) -> Result<Vec<CategoryStat>, ApiError> {
        let store = self.store.lock().unwrap();
        let mut stats: Vec<CategoryStat> = store
            .categories
            .iter()
            .map(|c| CategoryStat {
                category: c.title.clone(),
                posts: store
                    .posts
                    .iter()
                    .filter(|p| p.category_id == c.id && p.author_id == author_id)
                    .count() as i64,
            })
            .collect();
        stats.sort_by(|a, b| b.posts.cmp(&a.posts));
        Ok(stats)
    }

    async fn delete_posts(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let mut store = self.store.lock().unwrap();
        let before = store.posts.len();
        store.posts.retain(|p| !ids.contains(&p.id));
        store.post_likes.retain(|(_, pid)| !ids.contains(pid));
        Ok((before - store.posts.len()) as u64)
    }

    // --- Comments ---

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<CommentView, ApiError> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        let mut store = self.store.lock().unwrap();
        store.comments.push(comment.clone());
        Ok(comment_view(&store, &comment))
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn get_comments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Comment>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .comments
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn comments_by_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| comment_view(&store, c))
            .collect())
    }

    async fn comments_by_user(&self, user_id: Uuid) -> Result<Vec<UserCommentView>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .comments
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| {
                let post = store.posts.iter().find(|p| p.id == c.post_id);
                let post_author = post
                    .and_then(|p| store.users.iter().find(|u| u.id == p.author_id));
                UserCommentView {
                    id: c.id,
                    content: c.content.clone(),
                    likes: store
                        .comment_likes
                        .iter()
                        .filter(|(_, cid)| *cid == c.id)
                        .count() as i64,
                    post_title: post.map(|p| p.title.clone()),
                    post_slug: post.map(|p| p.slug.clone()),
                    post_author: post_author.map(|u| u.username.clone()),
                }
            })
            .collect())
    }

    async fn all_comments(&self) -> Result<Vec<CommentView>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .comments
            .iter()
            .map(|c| comment_view(&store, c))
            .collect())
    }

    async fn comments_liked_by(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PagedComments, ApiError> {
        let store = self.store.lock().unwrap();
        let liked: Vec<Uuid> = store
            .comment_likes
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .map(|(_, cid)| *cid)
            .collect();
        let views: Vec<CommentView> = store
            .comments
            .iter()
            .filter(|c| liked.contains(&c.id))
            .map(|c| comment_view(&store, c))
            .collect();
        let total = views.len() as i64;
        Ok(PagedComments {
            comments: paged(&views, page, per_page),
            total,
        })
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(comment) = store.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        comment.content = content.to_string();
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn toggle_comment_like(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeResponse, ApiError> {
        let mut store = self.store.lock().unwrap();
        let before = store.comment_likes.len();
        store
            .comment_likes
            .retain(|(uid, cid)| !(*uid == user_id && *cid == comment_id));
        let removed = store.comment_likes.len() < before;
        if !removed {
            store.comment_likes.push((user_id, comment_id));
        }
        let likes = store
            .comment_likes
            .iter()
            .filter(|(_, cid)| *cid == comment_id)
            .map(|(uid, _)| *uid)
            .collect();
        Ok(LikeResponse {
            liked: !removed,
            likes,
        })
    }

    async fn count_comments(&self, since: Option<DateTime<Utc>>) -> Result<i64, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .comments
            .iter()
            .filter(|c| since.is_none_or(|s| c.created_at >= s))
            .count() as i64)
    }

    async fn count_comments_by_post(&self, post_id: Uuid) -> Result<i64, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.comments.iter().filter(|c| c.post_id == post_id).count() as i64)
    }

    async fn count_comments_on_author_posts(
        &self,
        author_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, ApiError> {
        let store = self.store.lock().unwrap();
        let owned: Vec<Uuid> = store
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .map(|p| p.id)
            .collect();
        Ok(store
            .comments
            .iter()
            .filter(|c| owned.contains(&c.post_id))
            .filter(|c| since.is_none_or(|s| c.created_at >= s))
            .count() as i64)
    }

    async fn comment_like_total(&self, user_id: Uuid) -> Result<i64, ApiError> {
        let store = self.store.lock().unwrap();
        let owned: Vec<Uuid> = store
            .comments
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect();
        Ok(store
            .comment_likes
            .iter()
            .filter(|(_, cid)| owned.contains(cid))
            .count() as i64)
    }

    async fn delete_comments(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let mut store = self.store.lock().unwrap();
        let before = store.comments.len();
        store.comments.retain(|c| !ids.contains(&c.id));
        store.comment_likes.retain(|(_, cid)| !ids.contains(cid));
        Ok((before - store.comments.len()) as u64)
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> Result<u64, ApiError> {
        let mut store = self.store.lock().unwrap();
        let removed: Vec<Uuid> = store
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .collect();
        store.comments.retain(|c| c.post_id != post_id);
        store.comment_likes.retain(|(_, cid)| !removed.contains(cid));
        Ok(removed.len() as u64)
    }

    async fn delete_comments_by_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let mut store = self.store.lock().unwrap();
        let removed: Vec<Uuid> = store
            .comments
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect();
        store.comments.retain(|c| c.user_id != user_id);
        store.comment_likes.retain(|(_, cid)| !removed.contains(cid));
        Ok(removed.len() as u64)
    }

    // --- Categories ---

    async fn create_category(&self, category: NewCategory) -> Result<Category, ApiError> {
        let now = Utc::now();
        let row = Category {
            id: Uuid::new_v4(),
            title: category.title,
            slug: category.slug,
            description: category.description,
            icon: category.icon,
            image_url: category.image_url,
            image_key: category.image_key,
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().categories.push(row.clone());
        Ok(row)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn get_categories_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .categories
            .iter()
            .map(|c| CategoryWithCount {
                id: c.id,
                title: c.title.clone(),
                slug: c.slug.clone(),
                description: c.description.clone(),
                icon: c.icon.clone(),
                image_url: c.image_url.clone(),
                posts: store.posts.iter().filter(|p| p.category_id == c.id).count() as i64,
            })
            .collect())
    }

    async fn update_category(
        &self,
        id: Uuid,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(category) = store.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(v) = patch.title {
            category.title = v;
        }
        if let Some(v) = patch.slug {
            category.slug = v;
        }
        if let Some(v) = patch.description {
            category.description = v;
        }
        if patch.icon.is_some() {
            category.icon = patch.icon;
        }
        category.updated_at = Utc::now();
        Ok(Some(category.clone()))
    }

    async fn set_category_image(&self, id: Uuid, url: &str, key: &str) -> Result<bool, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(category) = store.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        category.image_url = url.to_string();
        category.image_key = Some(key.to_string());
        Ok(true)
    }

    async fn delete_categories(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let mut store = self.store.lock().unwrap();
        let before = store.categories.len();
        store.categories.retain(|c| !ids.contains(&c.id));
        Ok((before - store.categories.len()) as u64)
    }

    // --- Newsletter ---

    async fn subscribe(&self, email: &str) -> Result<NewsletterSubscription, ApiError> {
        let row = NewsletterSubscription {
            id: Uuid::new_v4(),
            email: email.to_string(),
            notification: true,
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().subscriptions.push(row.clone());
        Ok(row)
    }

    async fn find_subscription(
        &self,
        email: &str,
    ) -> Result<Option<NewsletterSubscription>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .subscriptions
            .iter()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn get_subscription(
        &self,
        id: Uuid,
    ) -> Result<Option<NewsletterSubscription>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.subscriptions.iter().find(|s| s.id == id).cloned())
    }

    async fn get_subscriptions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<NewsletterSubscription>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .subscriptions
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn list_subscriptions(&self) -> Result<Vec<NewsletterSubscription>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.subscriptions.clone())
    }

    async fn notified_emails(&self) -> Result<Vec<String>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .subscriptions
            .iter()
            .filter(|s| s.notification)
            .map(|s| s.email.clone())
            .collect())
    }

    async fn set_subscription_notification(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<Option<NewsletterSubscription>, ApiError> {
        let mut store = self.store.lock().unwrap();
        let Some(sub) = store.subscriptions.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        sub.notification = enabled;
        Ok(Some(sub.clone()))
    }

    async fn delete_subscriptions(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let mut store = self.store.lock().unwrap();
        let before = store.subscriptions.len();
        store.subscriptions.retain(|s| !ids.contains(&s.id));
        Ok((before - store.subscriptions.len()) as u64)
    }

    async fn count_subscriptions(&self) -> Result<i64, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(store.subscriptions.len() as i64)
    }
}

// --- AppState assembly ---

/// Bundles an in-memory repository with mock collaborators into an AppState,
/// returning handles to the mocks for assertions.
pub fn test_state(repo: Arc<MemoryRepository>) -> (AppState, MockAssetHost, MockMailer) {
    let assets = MockAssetHost::new();
    let mailer = MockMailer::new();
    let state = AppState {
        repo,
        assets: Arc::new(assets.clone()),
        mailer: Arc::new(mailer.clone()),
        config: AppConfig::default(),
    };
    (state, assets, mailer)
}

pub fn auth_user(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role,
    }
}

/// Builds a `Multipart` extractor from hand-rolled form-data, so multipart
/// handlers can be driven directly in tests.
pub async fn multipart_with(
    fields: &[(&str, &str)],
    image: Option<(&str, &str, &[u8])>,
) -> Multipart {
    use axum::extract::FromRequest;

    const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((filename, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = axum::http::Request::builder()
        .method("POST")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(axum::body::Body::from(body))
        .expect("failed to build multipart request");

    Multipart::from_request(request, &()).await.expect("valid multipart")
}
