#![allow(dead_code)]

use medcircle::models::{
    forum_moderator, notification, user, Forum, ForumModel, ForumModerator, Notification,
    NotificationModel, Post, PostModel, User, UserModel, UserRole,
};
use medcircle::services::forum::{ForumService, NewForum};
use medcircle::services::membership::MembershipService;
use medcircle::services::post::{NewPost, PostService};
use reqwest::Client;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn init_env() {
    INIT.call_once(|| {
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = medcircle::config::jwt::JwtConfig::from_env().unwrap();
        let _ = medcircle::utils::jwt::init_jwt_config(config);
    });
}

/// Fresh in-memory database with every migration applied. One connection, so
/// the whole test shares a single SQLite instance.
pub async fn setup_db() -> DatabaseConnection {
    init_env();
    let db = medcircle::config::database::connect("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory database");
    medcircle::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn create_user(db: &DatabaseConnection, prefix: &str, role: UserRole) -> UserModel {
    let n = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let username = format!("{}_{}", prefix, n);
    user::ActiveModel {
        username: sea_orm::ActiveValue::Set(username.clone()),
        email: sea_orm::ActiveValue::Set(format!("{}@medcircle.test", username)),
        role: sea_orm::ActiveValue::Set(role),
        aura: sea_orm::ActiveValue::Set(0),
        post_count: sea_orm::ActiveValue::Set(0),
        contribution_count: sea_orm::ActiveValue::Set(0),
        joined_forums_count: sea_orm::ActiveValue::Set(0),
        created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user")
}

pub async fn create_forum(
    db: &DatabaseConnection,
    owner_id: i32,
    requires_approval: bool,
    requires_post_approval: bool,
) -> ForumModel {
    ForumService::new(db.clone())
        .create(
            owner_id,
            NewForum {
                name: "Cardiology Circle".to_string(),
                description: "Heart health discussions".to_string(),
                rules: Some("Be kind".to_string()),
                requires_approval,
                requires_post_approval,
            },
        )
        .await
        .expect("Failed to create forum")
}

pub async fn join(db: &DatabaseConnection, forum_id: i32, user_id: i32) {
    MembershipService::new(db.clone())
        .join(forum_id, user_id)
        .await
        .expect("Failed to join forum");
}

pub async fn promote(db: &DatabaseConnection, forum_id: i32, owner_id: i32, user_id: i32) {
    MembershipService::new(db.clone())
        .add_moderator(forum_id, owner_id, user_id)
        .await
        .expect("Failed to add moderator");
}

pub async fn submit_post(
    db: &DatabaseConnection,
    forum_id: i32,
    author_id: i32,
    title: &str,
) -> PostModel {
    PostService::new(db.clone())
        .submit(
            forum_id,
            author_id,
            NewPost {
                title: title.to_string(),
                content: format!("Body of {}", title),
                image_url: None,
            },
        )
        .await
        .expect("Failed to submit post")
}

pub async fn reload_user(db: &DatabaseConnection, id: i32) -> UserModel {
    User::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .expect("User missing")
}

pub async fn reload_post(db: &DatabaseConnection, id: i32) -> PostModel {
    Post::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .expect("Post missing")
}

pub async fn reload_forum(db: &DatabaseConnection, id: i32) -> ForumModel {
    Forum::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .expect("Forum missing")
}

pub async fn notifications_of(
    db: &DatabaseConnection,
    user_id: i32,
    kind: &str,
) -> Vec<NotificationModel> {
    Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::Kind.eq(kind))
        .order_by_asc(notification::Column::Id)
        .all(db)
        .await
        .unwrap()
}

pub async fn moderator_ids(db: &DatabaseConnection, forum_id: i32) -> Vec<i32> {
    ForumModerator::find()
        .filter(forum_moderator::Column::ForumId.eq(forum_id))
        .order_by_asc(forum_moderator::Column::Id)
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.user_id)
        .collect()
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    pub fn token(&self, user_id: i32) -> String {
        medcircle::utils::encode_access_token(user_id).unwrap()
    }
}

pub async fn spawn_app() -> TestApp {
    let db = setup_db().await;

    let app = axum::Router::new()
        .merge(medcircle::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
    }
}
