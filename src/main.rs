use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use medcircle::{config, handlers, migration, routes, utils};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Forums
        handlers::forum::get_forum,
        handlers::forum::create_forum,
        handlers::forum::update_forum_settings,
        handlers::forum::delete_forum,
        // Membership
        handlers::membership::join_forum,
        handlers::membership::leave_forum,
        handlers::membership::leave_as_owner,
        handlers::membership::list_pending_members,
        handlers::membership::approve_member,
        handlers::membership::reject_member,
        handlers::membership::list_moderators,
        handlers::membership::add_moderator,
        handlers::membership::remove_moderator,
        // Bans
        handlers::ban::list_bans,
        handlers::ban::ban_user,
        handlers::ban::unban_user,
        // Posts
        handlers::post::list_posts,
        handlers::post::list_pending_posts,
        handlers::post::create_post,
        handlers::post::get_post,
        handlers::post::delete_post,
        handlers::post::validate_post,
        handlers::post::reject_post,
        handlers::post::react_post,
        // Comments
        handlers::comment::list_comments,
        handlers::comment::create_comment,
        handlers::comment::update_comment,
        handlers::comment::list_comment_edits,
        handlers::comment::delete_comment,
        handlers::comment::like_comment,
        // Notifications
        handlers::notification::list_notifications,
        handlers::notification::unread_count,
        handlers::notification::mark_all_read,
        handlers::notification::mark_read,
        // Admin
        handlers::admin::list_moderation_reports,
        handlers::admin::get_deleted_post,
    ),
    components(
        schemas(
            medcircle::response::ApiResponse<serde_json::Value>,
            medcircle::response::PaginatedResponse<serde_json::Value>,
            medcircle::response::PaginationQuery,
            medcircle::error::AppError,
            // Forums
            handlers::forum::ForumResponse,
            handlers::forum::CreateForumRequest,
            handlers::forum::UpdateForumSettingsRequest,
            handlers::forum::ForumSettingsResponse,
            medcircle::services::community::CascadeReport,
            medcircle::services::community::FailedPost,
            // Membership
            medcircle::services::membership::JoinOutcome,
            handlers::membership::PendingMemberResponse,
            handlers::membership::ModeratorResponse,
            handlers::membership::OwnershipTransferResponse,
            // Bans
            handlers::ban::BanUserRequest,
            handlers::ban::BanResponse,
            // Posts
            handlers::post::PostResponse,
            handlers::post::DeletedPostResponse,
            handlers::post::CreatePostRequest,
            handlers::post::RejectPostRequest,
            handlers::post::ReactRequest,
            medcircle::services::post::PostRemoval,
            medcircle::services::post::ReactionSummary,
            // Comments
            handlers::comment::CommentResponse,
            handlers::comment::CommentTreeNode,
            handlers::comment::CommentEditResponse,
            handlers::comment::CommentDeletionResponse,
            handlers::comment::CreateCommentRequest,
            handlers::comment::UpdateCommentRequest,
            medcircle::services::comment::LikeOutcome,
            // Notifications
            handlers::notification::NotificationResponse,
            handlers::notification::UnreadCountResponse,
            handlers::notification::MarkAllReadResponse,
            // Admin
            handlers::admin::ModerationReportResponse,
        )
    ),
    tags(
        (name = "forums", description = "Community lifecycle"),
        (name = "membership", description = "Joining, leaving and moderator roster"),
        (name = "bans", description = "Per-forum ban registry"),
        (name = "posts", description = "Post submission and moderation queue"),
        (name = "comments", description = "Threaded comments"),
        (name = "notifications", description = "In-app notifications"),
        (name = "admin", description = "Moderation audit trail"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "medcircle=debug,tower_http=debug,axum=debug".into()),
    );
    // LOG_FORMAT=json for log shippers; human-readable otherwise.
    if env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Fail fast on bad configuration
    let jwt_config = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting MedCircle moderation API v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let moderation = config::moderation::ModerationConfig::global();
    tracing::info!(
        cascade_user_batch_size = moderation.cascade_user_batch_size,
        notification_max_per_user = moderation.notification_max_per_user,
        notification_ttl_days = moderation.notification_ttl_days,
        "Moderation settings loaded"
    );

    let app = create_app().layer(Extension(db));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn validate_config() -> anyhow::Result<config::jwt::JwtConfig> {
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    Ok(jwt_config)
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db.ping().await.is_ok();
    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "MedCircle moderation API",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
