use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are **unauthenticated** and accessible to any client:
/// read-only content access, the identity flow (register/login/verify/reset),
/// and the public newsletter subscribe.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness endpoint for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Identity flow ---
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        // Verification and reset links arrive from email, so both are
        // reachable without a credential.
        .route(
            "/api/auth/{user_id}/verify/{token}",
            get(handlers::auth::verify_account),
        )
        .route(
            "/api/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/api/auth/reset-password/{user_id}/{token}",
            get(handlers::auth::check_reset_link).post(handlers::auth::reset_password),
        )
        // --- Posts (read-only) ---
        // GET /api/posts?category=...&search=...&page=...&per_page=...
        .route("/api/posts", get(handlers::posts::list_posts))
        // The path parameter is the post's slug; the template shares the
        // `{id}` name with the authenticated PUT/DELETE routes on this path.
        .route("/api/posts/{id}", get(handlers::posts::get_post))
        .route("/api/posts/user/{id}", get(handlers::posts::posts_by_author))
        .route(
            "/api/posts/liked/user/{id}",
            get(handlers::posts::liked_posts),
        )
        .route(
            "/api/posts/latest/author/{id}",
            get(handlers::posts::latest_posts_by_author),
        )
        // --- Comments (read-only) ---
        .route(
            "/api/comments/post/{id}",
            get(handlers::comments::comments_by_post),
        )
        .route(
            "/api/comments/user/{id}",
            get(handlers::comments::comments_by_user),
        )
        // --- Categories (read-only) ---
        .route("/api/categories", get(handlers::categories::list_categories))
        .route(
            "/api/categories/{slug}",
            get(handlers::categories::get_category),
        )
        // --- Users (read-only) ---
        .route(
            "/api/users/profile/{id}",
            get(handlers::users::get_profile),
        )
        .route("/api/users/admin", get(handlers::users::get_admin))
        // --- Newsletter ---
        // POST /api/newsletter
        // Public subscribe; everything else newsletter-related is admin-only.
        .route("/api/newsletter", post(handlers::newsletter::subscribe))
}
