use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::handlers::users::UserSummary;
use crate::models::Role;
use crate::pipeline::{FieldType, Pipeline, RequestContext, Schema};
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct LoginBody {
    identifier: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: UserSummary,
}

/// ログインハンドラー
///
/// POST /auth/login
///
/// 処理フロー:
/// 1. ボディバリデーション（identifier / password 必須）
/// 2. 資格情報検証（パスワード不一致・ユーザー不在とも同一の401）
/// 3. ブロック済みチェック（資格情報が正しくても403）
/// 4. ロールチェック（ダッシュボードはADMIN専用、403）
/// 5. トークンペア発行
pub async fn login(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = RequestContext::new(headers, body);

    Pipeline::new()
        .validate(
            Schema::new()
                .required("identifier", FieldType::String)
                .required("password", FieldType::String),
        )
        .run(ctx, |ctx| handle(state, ctx))
        .await
}

async fn handle(state: AppState, ctx: RequestContext) -> Result<Response, AppError> {
    let body: LoginBody = ctx.body_as()?;

    let auth_service = AuthService::new(state.user_repo.clone());
    let user = auth_service
        .authenticate(&body.identifier, &body.password)
        .await?;

    if user.blocked {
        tracing::warn!(user_id = %user.id, "ログイン拒否: ブロック済みアカウント");
        return Err(AppError::Authorization("Votre compte est bloqué".to_string()));
    }

    if user.role != Role::Admin {
        tracing::warn!(user_id = %user.id, role = ?user.role, "ログイン拒否: 管理者以外");
        return Err(AppError::Authorization(
            "Accès réservé aux administrateurs".to_string(),
        ));
    }

    let pair = state.token_service.issue_pair(user.id)?;

    tracing::info!(user_id = %user.id, "ログイン成功");

    Ok(Envelope::success(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: UserSummary::from(&user),
    })
    .into_response())
}
