use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Routes exclusively for the admin role: moderation, user management,
/// category and newsletter administration, and dashboard statistics.
///
/// Access Control:
/// This router is nested under `/api/admin` behind the authentication layer;
/// every handler additionally re-checks `role == admin` through the
/// authorization engine before touching the store.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats
        // Core dashboard counters (posts, users by role, comments,
        // subscribers) with trailing-30-day deltas.
        .route("/stats", get(handlers::admin::dashboard_stats))
        // GET /api/admin/posts/stats
        // Post distribution across categories.
        .route("/posts/stats", get(handlers::admin::category_stats))
        // --- User management ---
        .route("/users", get(handlers::admin::list_users))
        .route(
            "/users/authors",
            get(handlers::admin::list_authors).post(handlers::admin::create_author),
        )
        .route("/users/readers", get(handlers::admin::list_readers))
        .route("/users/authors/count", get(handlers::admin::authors_count))
        .route("/users/readers/count", get(handlers::admin::readers_count))
        // --- Moderation ---
        .route("/comments", get(handlers::admin::all_comments))
        // --- Categories (admin-managed writes; public reads live in the
        //     public router) ---
        .route(
            "/categories",
            post(handlers::categories::create_category)
                .delete(handlers::categories::delete_many_categories),
        )
        .route(
            "/categories/{id}",
            put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route(
            "/categories/upload-image/{id}",
            put(handlers::categories::update_category_image),
        )
        // --- Newsletter administration ---
        .route(
            "/newsletter",
            get(handlers::newsletter::list_subscriptions)
                .delete(handlers::newsletter::delete_many_subscriptions),
        )
        .route(
            "/newsletter/{id}",
            put(handlers::newsletter::toggle_subscription)
                .delete(handlers::newsletter::delete_subscription),
        )
}
