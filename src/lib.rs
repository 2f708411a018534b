use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod cascade;
pub mod config;
pub mod email;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser; // The resolved authenticated user identity.
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point.
pub use config::AppConfig;
pub use email::{MailerState, MockMailer, SmtpMailer};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockAssetHost, S3AssetHost, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application by aggregating every annotated handler path and schema.
/// Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register, handlers::auth::login, handlers::auth::verify_account,
        handlers::auth::forgot_password, handlers::auth::check_reset_link,
        handlers::auth::reset_password,
        handlers::posts::create_post, handlers::posts::list_posts, handlers::posts::get_post,
        handlers::posts::update_post, handlers::posts::update_post_image,
        handlers::posts::toggle_post_like, handlers::posts::delete_post,
        handlers::posts::delete_many_posts, handlers::posts::posts_by_author,
        handlers::posts::liked_posts, handlers::posts::latest_posts_by_author,
        handlers::comments::create_comment, handlers::comments::comments_by_post,
        handlers::comments::comments_by_user, handlers::comments::update_comment,
        handlers::comments::toggle_comment_like, handlers::comments::delete_comment,
        handlers::comments::delete_many_comments, handlers::comments::liked_comments,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::update_category_image, handlers::categories::delete_category,
        handlers::categories::delete_many_categories,
        handlers::users::get_profile, handlers::users::get_admin, handlers::users::get_me,
        handlers::users::update_profile,
        handlers::users::update_password, handlers::users::upload_avatar,
        handlers::users::delete_account,
        handlers::newsletter::subscribe, handlers::newsletter::list_subscriptions,
        handlers::newsletter::toggle_subscription, handlers::newsletter::delete_subscription,
        handlers::newsletter::delete_many_subscriptions,
        handlers::admin::dashboard_stats, handlers::admin::category_stats,
        handlers::admin::list_users, handlers::admin::list_authors,
        handlers::admin::list_readers, handlers::admin::authors_count,
        handlers::admin::readers_count, handlers::admin::create_author,
        handlers::admin::all_comments,
        handlers::dashboard::author_stats, handlers::dashboard::my_latest_posts,
        handlers::dashboard::my_category_stats,
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::Post, models::PostView, models::PostRef,
            models::Comment, models::CommentView, models::UserCommentView, models::Category,
            models::CategoryWithCount, models::NewsletterSubscription,
            models::RegisterRequest, models::LoginRequest, models::ForgotPasswordRequest,
            models::ResetPasswordRequest, models::CreatePostFields, models::UpdatePostRequest,
            models::CreateCommentRequest, models::UpdateCommentRequest,
            models::CreateCategoryFields, models::UpdateCategoryRequest,
            models::CreateAuthorRequest, models::UpdateProfileRequest,
            models::UpdatePasswordRequest, models::SubscribeRequest,
            models::DeletePostsRequest, models::DeleteCommentsRequest,
            models::DeleteCategoriesRequest, models::DeleteSubscriptionsRequest,
            models::MessageResponse, models::LoginResponse, models::PagedPosts,
            models::PostDetail, models::LikeResponse, models::PagedComments,
            models::DashboardStats, models::UserOverview, models::CategoryStat,
            models::CategoryStatsResponse, models::AuthorStats, models::AuthorCategoryStats,
            models::RoleCount, handlers::users::AvatarResponse,
        )
    ),
    tags(
        (name = "inkpress", description = "Inkpress blogging platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: abstracts the document store behind a trait object.
    pub repo: RepositoryState,
    /// Asset host: hosted image storage and release.
    pub assets: StorageState,
    /// Mail transport: verification, reset and newsletter mail.
    pub mailer: MailerState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These let extractors and handlers selectively pull components from the
// shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.assets.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the protected route groups. `AuthUser`
/// implements `FromRequestParts`, so a failed extraction (bad or missing
/// credential, deleted account) rejects the request with 401 before the
/// handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS configuration.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base router assembly.
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated routes: protected by the auth middleware.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin routes: authenticated like the group above; the admin role
        // check itself happens inside the handlers.
        .nest(
            "/api/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and correlation layers (outermost).
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID per request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in
                // a span correlated by the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes span creation for `TraceLayer`: includes the `x-request-id`
/// header so every log line of a request is correlated by a unique id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
