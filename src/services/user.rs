use crate::{
    error::{AppError, AppResult},
    models::{User, UserModel},
};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait};

pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, user_id: i32) -> AppResult<UserModel> {
        find_user(&self.db, user_id).await
    }
}

/// Loads a user on any connection, transaction included.
pub async fn find_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> AppResult<UserModel> {
    User::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}
