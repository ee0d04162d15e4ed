use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::pipeline::{FieldType, Pipeline, RequestContext, Schema};
use crate::services::PasswordRecoveryService;
use crate::state::AppState;

fn recovery_service(state: &AppState) -> PasswordRecoveryService {
    PasswordRecoveryService::new(
        state.user_repo.clone(),
        state.otp_repo.clone(),
        state.email_service.clone(),
        state.token_service.clone(),
        state.config.clone(),
    )
}

/// 新パスワードの最小要件（8文字以上）
pub(super) fn validate_new_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Le mot de passe doit contenir au moins 8 caractères".to_string(),
        ));
    }
    Ok(())
}

// === OTP発行リクエスト ===

#[derive(Debug, Deserialize)]
struct ForgotPasswordBody {
    email: String,
}

#[derive(Debug, Serialize)]
struct ForgotPasswordResponse {
    message: String,
}

/// POST /auth/forgot-password
///
/// # Security
/// 常に同一の成功応答を返す（ユーザー存在有無を漏洩しない）
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = RequestContext::new(headers, body);

    Pipeline::new()
        .validate(Schema::new().required("email", FieldType::String))
        .run(ctx, |ctx| handle_forgot(state, ctx))
        .await
}

async fn handle_forgot(state: AppState, ctx: RequestContext) -> Result<Response, AppError> {
    let body: ForgotPasswordBody = ctx.body_as()?;

    recovery_service(&state).request_otp(&body.email).await?;

    Ok(Envelope::success(ForgotPasswordResponse {
        message: "Un code de vérification a été envoyé par email".to_string(),
    })
    .into_response())
}

// === OTP検証 ===

#[derive(Debug, Deserialize)]
struct VerifyOtpBody {
    email: String,
    otp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpResponse {
    reset_token: String,
}

/// POST /auth/verify-otp
///
/// OTPは消費と同時に無効化される。同じコードの再送信は400。
pub async fn verify_otp(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = RequestContext::new(headers, body);

    Pipeline::new()
        .validate(
            Schema::new()
                .required("email", FieldType::String)
                .required("otp", FieldType::String),
        )
        .run(ctx, |ctx| handle_verify(state, ctx))
        .await
}

async fn handle_verify(state: AppState, ctx: RequestContext) -> Result<Response, AppError> {
    let body: VerifyOtpBody = ctx.body_as()?;

    let reset_token = recovery_service(&state)
        .verify_otp(&body.email, &body.otp)
        .await?;

    Ok(Envelope::success(VerifyOtpResponse { reset_token }).into_response())
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordBody {
    reset_token: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct ResetPasswordResponse {
    message: String,
}

/// POST /auth/reset-password
///
/// # Security
/// - resetToken, password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = RequestContext::new(headers, body);

    Pipeline::new()
        .validate(
            Schema::new()
                .required("resetToken", FieldType::String)
                .required("password", FieldType::String),
        )
        .run(ctx, |ctx| handle_reset(state, ctx))
        .await
}

async fn handle_reset(state: AppState, ctx: RequestContext) -> Result<Response, AppError> {
    let body: ResetPasswordBody = ctx.body_as()?;

    validate_new_password(&body.password)?;

    recovery_service(&state)
        .reset_password(&body.reset_token, &body.password)
        .await?;

    Ok(Envelope::success(ResetPasswordResponse {
        message: "Mot de passe réinitialisé".to_string(),
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_password_rejected() {
        let result = validate_new_password("court");
        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("8")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_eight_chars_accepted() {
        assert!(validate_new_password("12345678").is_ok());
    }
}
