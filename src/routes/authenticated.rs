use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any caller holding a valid bearer credential. Every handler
/// here relies on the `AuthUser` extractor middleware being layered above
/// this module; ownership and role checks are then made against the resolved
/// identity via the authorization engine.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Own profile & author dashboard ---
        .route("/api/me", get(handlers::users::get_me))
        .route("/api/me/stats", get(handlers::dashboard::author_stats))
        .route(
            "/api/me/posts/latest",
            get(handlers::dashboard::my_latest_posts),
        )
        .route(
            "/api/me/posts/stats",
            get(handlers::dashboard::my_category_stats),
        )
        // --- Posts ---
        // POST /api/posts (multipart: image + fields); authors/admins only.
        // DELETE /api/posts carries the batch payload { posts_ids: [...] }.
        .route(
            "/api/posts",
            post(handlers::posts::create_post).delete(handlers::posts::delete_many_posts),
        )
        // PUT/DELETE enforce owner-or-admin inside the handler.
        .route(
            "/api/posts/{id}",
            put(handlers::posts::update_post).delete(handlers::posts::delete_post),
        )
        .route(
            "/api/posts/upload-photo/{id}",
            put(handlers::posts::update_post_image),
        )
        // PUT /api/posts/like/{id}
        // Toggle semantics: a second call undoes the first.
        .route("/api/posts/like/{id}", put(handlers::posts::toggle_post_like))
        // --- Comments ---
        .route(
            "/api/comments",
            post(handlers::comments::create_comment)
                .delete(handlers::comments::delete_many_comments),
        )
        .route(
            "/api/comments/{id}",
            put(handlers::comments::update_comment).delete(handlers::comments::delete_comment),
        )
        // Comment likes require authentication, same as post likes.
        .route(
            "/api/comments/like/{id}",
            put(handlers::comments::toggle_comment_like),
        )
        .route(
            "/api/comments/liked",
            get(handlers::comments::liked_comments),
        )
        // --- Account management ---
        // Profile and password are self-only; deletion is self-or-admin and
        // triggers the account cascade.
        .route(
            "/api/users/profile/{id}",
            put(handlers::users::update_profile).delete(handlers::users::delete_account),
        )
        .route(
            "/api/users/password/{id}",
            put(handlers::users::update_password),
        )
        .route(
            "/api/users/profile/upload-profile-photo",
            post(handlers::users::upload_avatar),
        )
}
