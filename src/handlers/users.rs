use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::pipeline::{Pipeline, RequestContext};
use crate::state::AppState;

/// API上のユーザー表現（password_hash を含まない）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}

/// 自分自身のプロフィール取得
///
/// GET /auth/me （要認証）
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = RequestContext::new(headers, Bytes::new());

    Pipeline::new()
        .authenticate(state.token_service.clone())
        .run(ctx, |ctx| handle_me(state, ctx))
        .await
}

async fn handle_me(state: AppState, ctx: RequestContext) -> Result<Response, AppError> {
    let user_id = ctx
        .user_id()
        .ok_or_else(|| AppError::Authentication("Non authentifié".to_string()))?;

    let user = state
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("Non authentifié".to_string()))?;

    Ok(Envelope::success(UserSummary::from(&user)).into_response())
}

/// ユーザー一覧の閲覧を許可するロール
const LIST_ROLES: &[Role] = &[Role::Admin, Role::Manager];

/// ユーザー一覧
///
/// GET /users （要認証、ADMIN / MANAGER のみ）
pub async fn list_users(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = RequestContext::new(headers, Bytes::new());

    Pipeline::new()
        .authenticate(state.token_service.clone())
        .require_role(state.user_repo.clone(), LIST_ROLES)
        .run(ctx, |ctx| handle_list(state, ctx))
        .await
}

async fn handle_list(state: AppState, _ctx: RequestContext) -> Result<Response, AppError> {
    let users = state.user_repo.list().await?;
    let summaries: Vec<UserSummary> = users.iter().map(UserSummary::from).collect();

    Ok(Envelope::success(summaries).into_response())
}
