use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::handlers::password_recovery::validate_new_password;
use crate::pipeline::{FieldType, Pipeline, RequestContext, Schema};
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordBody {
    current_password: String,
    new_password: String,
}

#[derive(Debug, Serialize)]
struct ChangePasswordResponse {
    message: String,
}

/// パスワード変更ハンドラー
///
/// POST /auth/change-password （要認証）
///
/// バリデーション → 認証の順で実行される。バリデーション失敗時は
/// トークン検証自体が走らない。
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = RequestContext::new(headers, body);

    Pipeline::new()
        .validate(
            Schema::new()
                .required("currentPassword", FieldType::String)
                .required("newPassword", FieldType::String),
        )
        .authenticate(state.token_service.clone())
        .run(ctx, |ctx| handle(state, ctx))
        .await
}

async fn handle(state: AppState, ctx: RequestContext) -> Result<Response, AppError> {
    let user_id = ctx
        .user_id()
        .ok_or_else(|| AppError::Authentication("Non authentifié".to_string()))?;

    let body: ChangePasswordBody = ctx.body_as()?;

    validate_new_password(&body.new_password)?;

    AuthService::new(state.user_repo.clone())
        .change_password(user_id, &body.current_password, &body.new_password)
        .await?;

    Ok(Envelope::success(ChangePasswordResponse {
        message: "Mot de passe modifié".to_string(),
    })
    .into_response())
}
