use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;

/// リクエストコンテキスト
///
/// パイプラインを流れる1リクエスト分の可変バッグ。
/// validate が `body`、authenticate が `user_id` を書き込み、
/// ターミナルハンドラーが読み取る。1リクエストが排他的に所有し、
/// 応答生成後に破棄される（リクエスト間で共有しない）。
#[derive(Debug)]
pub struct RequestContext {
    headers: HeaderMap,
    raw_body: Bytes,
    body: Option<Value>,
    user_id: Option<Uuid>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, raw_body: Bytes) -> Self {
        Self {
            headers,
            raw_body,
            body: None,
            user_id: None,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// 検証済みボディを書き込む（validate インターセプターのみが呼ぶ）
    pub fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// 検証済みボディを型付きで取り出す
    ///
    /// validate を通していないパイプラインで呼ぶのはプログラミングエラー
    /// （スキーマと構造体の不一致も同様）なので Internal にする。
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let value = self
            .body
            .clone()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("body accessed before validation")))?;

        serde_json::from_value(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("body deserialize error: {e}")))
    }

    /// 認証済みユーザーIDを書き込む（authenticate インターセプターのみが呼ぶ）
    pub fn set_user_id(&mut self, user_id: Uuid) {
        self.user_id = Some(user_id);
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }
}
