use crate::{
    error::{AppError, AppResult},
    models::UserModel,
    services::user::UserService,
    utils::jwt::decode_jwt,
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::DatabaseConnection;
use std::convert::Infallible;

/// Caller identity resolved from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i32,
}

/// Verifies the bearer JWT, checks the subject exists, and stores the
/// resulting `AuthUser` in request extensions.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = resolve_user(&db, &headers).await?;
    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}

/// Like `auth_middleware`, but a missing or unusable token lets the request
/// through anonymously instead of rejecting it.
pub async fn optional_auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match resolve_user(&db, &headers).await {
        Ok(user_id) => {
            request.extensions_mut().insert(AuthUser { user_id });
        }
        Err(AppError::Unauthorized) => {}
        Err(e) => return Err(e),
    }
    Ok(next.run(request).await)
}

async fn resolve_user(db: &DatabaseConnection, headers: &HeaderMap) -> AppResult<i32> {
    let token = extract_bearer_token(headers).ok_or(AppError::Unauthorized)?;
    let claims = decode_jwt(&token).map_err(|_| AppError::Unauthorized)?;
    let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;

    // Tokens for users the platform no longer knows are rejected.
    UserService::new(db.clone())
        .get_by_id(user_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound => AppError::Unauthorized,
            other => other,
        })?;

    Ok(user_id)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Verify the current user has the platform admin role
pub async fn require_admin(db: &DatabaseConnection, auth_user: &AuthUser) -> AppResult<UserModel> {
    let user = UserService::new(db.clone()).get_by_id(auth_user.user_id).await?;
    if !user.role.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().copied())
    }
}
