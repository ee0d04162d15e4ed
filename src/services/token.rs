use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

/// トークン種別
///
/// 種別ごとに署名シークレットが異なり、検証時には claims の kind も
/// 照合する。シークレットを共有する設定にされても、refresh/reset トークンを
/// アクセストークンとして使い回すことはできない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

/// JWTクレーム
///
/// jti はランダム値。同一秒内に同一ユーザーへ2回発行しても
/// トークン文字列が一致しないようにするため。
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// ログイン・リフレッシュ時に発行されるトークンペア
///
/// リフレッシュ時も両方ローテーションする（漏洩した refresh トークンの
/// リプレイ可能期間を短くする）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl KindKeys {
    fn from_secret(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }
}

/// トークンサービス
///
/// ステートレス設計: トークンはサーバー側に保存せず、検証は署名と
/// 有効期限のみで決まる。失効リストは持たないため、発行済みトークンは
/// 自然失効まで有効（受容済みのトレードオフ、DESIGN.md 参照）。
#[derive(Clone)]
pub struct TokenService {
    access: KindKeys,
    refresh: KindKeys,
    reset: KindKeys,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self::from_secrets(
            config.access_token_secret.expose_secret(),
            config.access_token_ttl_secs,
            config.refresh_token_secret.expose_secret(),
            config.refresh_token_ttl_secs,
            config.reset_token_secret.expose_secret(),
            config.reset_token_ttl_secs,
        )
    }

    /// Config を経由しない生のコンストラクタ（テストでも使用）
    pub fn from_secrets(
        access_secret: &str,
        access_ttl_secs: i64,
        refresh_secret: &str,
        refresh_ttl_secs: i64,
        reset_secret: &str,
        reset_ttl_secs: i64,
    ) -> Self {
        Self {
            access: KindKeys::from_secret(access_secret, access_ttl_secs),
            refresh: KindKeys::from_secret(refresh_secret, refresh_ttl_secs),
            reset: KindKeys::from_secret(reset_secret, reset_ttl_secs),
        }
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
            TokenKind::Reset => &self.reset,
        }
    }

    fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, AppError> {
        let keys = self.keys(kind);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id,
            kind,
            iat: now,
            exp: now + keys.ttl_secs,
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
            tracing::error!(error = ?e, "トークンエンコードエラー");
            AppError::Internal(anyhow::anyhow!("token encode error"))
        })
    }

    /// 検証。失敗（署名不正・期限切れ・種別不一致）はすべて None。
    /// どのチェックで落ちたかは呼び出し側に伝えない。
    fn verify(&self, token: &str, kind: TokenKind) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // 期限切れ直後のトークンを許容しない
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation).ok()?;

        (data.claims.kind == kind).then_some(data.claims)
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue(user_id, TokenKind::Access)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue(user_id, TokenKind::Refresh)
    }

    pub fn issue_reset(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue(user_id, TokenKind::Reset)
    }

    pub fn verify_access(&self, token: &str) -> Option<Claims> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Option<Claims> {
        self.verify(token, TokenKind::Refresh)
    }

    pub fn verify_reset(&self, token: &str) -> Option<Claims> {
        self.verify(token, TokenKind::Reset)
    }

    /// アクセス＋リフレッシュのペアを発行（ログイン成功時・リフレッシュ成功時）
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id)?,
            refresh_token: self.issue_refresh(user_id)?,
        })
    }
}
