use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::{auth_middleware, optional_auth_middleware};
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let read =
        read_routes(&rate_limit_config).layer(middleware::from_fn(optional_auth_middleware));
    let write = write_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));
    let moderation =
        moderation_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    read.merge(write).merge(moderation)
}

/// Public reads. A valid token, if sent, identifies the caller.
fn read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/forums/{id}", routing::get(handlers::forum::get_forum))
        .route(
            "/forums/{id}/posts",
            routing::get(handlers::post::list_posts),
        )
        .route(
            "/forums/{id}/moderators",
            routing::get(handlers::membership::list_moderators),
        )
        .route("/posts/{id}", routing::get(handlers::post::get_post))
        .route(
            "/posts/{id}/comments",
            routing::get(handlers::comment::list_comments),
        )
        .route(
            "/comments/{id}/edits",
            routing::get(handlers::comment::list_comment_edits),
        );

    with_optional_rate_limit(router, config.enabled, config.read)
}

/// Authenticated member actions.
fn write_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Forums
        .route("/forums", routing::post(handlers::forum::create_forum))
        .route(
            "/forums/{id}",
            routing::delete(handlers::forum::delete_forum),
        )
        .route(
            "/forums/{id}/settings",
            routing::put(handlers::forum::update_forum_settings),
        )
        // Membership
        .route(
            "/forums/{id}/join",
            routing::post(handlers::membership::join_forum),
        )
        .route(
            "/forums/{id}/leave",
            routing::post(handlers::membership::leave_forum),
        )
        .route(
            "/forums/{id}/owner/leave",
            routing::post(handlers::membership::leave_as_owner),
        )
        // Posts
        .route(
            "/forums/{id}/posts",
            routing::post(handlers::post::create_post),
        )
        .route("/posts/{id}", routing::delete(handlers::post::delete_post))
        .route("/posts/{id}/react", routing::post(handlers::post::react_post))
        // Comments
        .route(
            "/posts/{id}/comments",
            routing::post(handlers::comment::create_comment),
        )
        .route(
            "/comments/{id}",
            routing::put(handlers::comment::update_comment)
                .delete(handlers::comment::delete_comment),
        )
        .route(
            "/comments/{id}/like",
            routing::post(handlers::comment::like_comment),
        )
        // Notifications
        .route(
            "/notifications",
            routing::get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/unread-count",
            routing::get(handlers::notification::unread_count),
        )
        .route(
            "/notifications/read-all",
            routing::put(handlers::notification::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            routing::put(handlers::notification::mark_read),
        );

    with_optional_rate_limit(router, config.enabled, config.write)
}

/// Moderator, owner and admin actions.
fn moderation_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Join queue
        .route(
            "/forums/{id}/members/pending",
            routing::get(handlers::membership::list_pending_members),
        )
        .route(
            "/forums/{id}/members/{user_id}/approve",
            routing::post(handlers::membership::approve_member),
        )
        .route(
            "/forums/{id}/members/{user_id}/reject",
            routing::post(handlers::membership::reject_member),
        )
        // Moderator roster
        .route(
            "/forums/{id}/moderators/{user_id}",
            routing::post(handlers::membership::add_moderator)
                .delete(handlers::membership::remove_moderator),
        )
        // Bans
        .route(
            "/forums/{id}/bans",
            routing::get(handlers::ban::list_bans).post(handlers::ban::ban_user),
        )
        .route(
            "/forums/{id}/bans/{user_id}",
            routing::delete(handlers::ban::unban_user),
        )
        // Post queue
        .route(
            "/forums/{id}/posts/pending",
            routing::get(handlers::post::list_pending_posts),
        )
        .route(
            "/posts/{id}/validate",
            routing::post(handlers::post::validate_post),
        )
        .route(
            "/posts/{id}/reject",
            routing::post(handlers::post::reject_post),
        )
        // Admin
        .route(
            "/admin/moderation-reports",
            routing::get(handlers::admin::list_moderation_reports),
        )
        .route(
            "/admin/deleted-posts/{id}",
            routing::get(handlers::admin::get_deleted_post),
        );

    with_optional_rate_limit(router, config.enabled, config.moderation)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!(?rule, "Invalid rate limit rule, serving group without a limit");
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
