use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::envelope::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("認証エラー: {0}")]
    Authentication(String),

    #[error("認可エラー: {0}")]
    Authorization(String),

    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    #[error("OTPコードが無効または期限切れ")]
    OtpInvalid,

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("メール送信エラー: {0}")]
    Email(String),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // メッセージはハンドラー側で付与済み（フィールド名＋違反内容のみ、内部情報なし）
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // 意図的に曖昧なメッセージ（ユーザー存在有無や失敗理由を漏洩しない）
            Self::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Authorization(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::OtpInvalid => (
                StatusCode::BAD_REQUEST,
                "Code OTP invalide ou expiré".to_string(),
            ),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erreur interne du serveur".to_string(),
                )
            }
            Self::Email(e) => {
                tracing::error!(error = %e, "メール送信エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erreur interne du serveur".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erreur interne du serveur".to_string(),
                )
            }
        };

        (status, Json(Envelope::<()>::error(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let resp = AppError::Validation("Le champ email est requis".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_authentication_maps_to_401() {
        let resp =
            AppError::Authentication("Identifiants incorrects".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_authorization_maps_to_403() {
        let resp = AppError::Authorization("Accès refusé".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_otp_invalid_maps_to_400() {
        let resp = AppError::OtpInvalid.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_hides_detail() {
        let resp = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
