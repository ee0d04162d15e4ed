use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::pipeline::{FieldType, Pipeline, RequestContext, Schema};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
}

/// トークンリフレッシュハンドラー
///
/// POST /auth/refresh
///
/// 検証に成功したらアクセス・リフレッシュ両方を再発行する
/// （漏洩した refresh トークンのリプレイ可能期間を短くする）。
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = RequestContext::new(headers, body);

    Pipeline::new()
        .validate(Schema::new().required("refreshToken", FieldType::String))
        .run(ctx, |ctx| handle(state, ctx))
        .await
}

async fn handle(state: AppState, ctx: RequestContext) -> Result<Response, AppError> {
    let body: RefreshBody = ctx.body_as()?;

    let claims = state
        .token_service
        .verify_refresh(&body.refresh_token)
        .ok_or_else(|| {
            AppError::Authentication("Refresh token invalide ou expiré".to_string())
        })?;

    let pair = state.token_service.issue_pair(claims.sub)?;

    tracing::info!(user_id = %claims.sub, "トークンリフレッシュ完了");

    Ok(Envelope::success(pair).into_response())
}
