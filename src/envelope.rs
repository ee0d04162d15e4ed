use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// レスポンスステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// 統一レスポンスエンベロープ
///
/// 全エンドポイントの応答は `{status, data, error}` の形を取る。
/// `data` と `error` は排他（コンストラクタ経由でのみ生成することで保証）。
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: Status,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// 成功エンベロープは常に 200（エラー側のステータスコードは AppError が決める）
impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_data_only() {
        let envelope = Envelope::success(42);
        assert_eq!(envelope.status, Status::Success);
        assert!(envelope.data.is_some());
        assert!(envelope.error.is_none());
    }

    #[test]
    fn test_error_has_error_only() {
        let envelope = Envelope::<()>::error("Identifiants incorrects");
        assert_eq!(envelope.status, Status::Error);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.as_deref(), Some("Identifiants incorrects"));
    }

    #[test]
    fn test_success_wire_shape() {
        let value = serde_json::to_value(Envelope::success("ok")).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"], "ok");
        assert_eq!(value["error"], serde_json::Value::Null);
    }

    #[test]
    fn test_error_wire_shape() {
        let value = serde_json::to_value(Envelope::<()>::error("Erreur")).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["data"], serde_json::Value::Null);
        assert_eq!(value["error"], "Erreur");
    }
}
