use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;

use crate::error::AppError;
use crate::models::Role;
use crate::pipeline::compose::{Interceptor, Outcome};
use crate::pipeline::context::RequestContext;
use crate::repositories::UserRepository;
use crate::services::TokenService;

/// `Authorization: Bearer <token>` からトークンを取り出す
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// 401 応答で短絡する
///
/// ヘッダー欠落・署名不正・期限切れ・種別不一致のいずれでも同一応答
/// （どのチェックで落ちたかをオラクルにしない）。
fn halt_unauthenticated() -> Outcome {
    Outcome::Halt(AppError::Authentication("Non authentifié".to_string()).into_response())
}

/// 認証インターセプター
///
/// アクセストークンを検証し、成功時にユーザーIDをコンテキストへ書き込む。
/// refresh / reset トークンは署名が正しくても拒否される
/// （TokenService の kind チェック）。
pub struct Authenticate {
    token_service: TokenService,
}

impl Authenticate {
    pub fn new(token_service: TokenService) -> Self {
        Self { token_service }
    }
}

#[async_trait]
impl Interceptor for Authenticate {
    async fn call(&self, ctx: &mut RequestContext) -> Outcome {
        let Some(token) = bearer_token(ctx.headers()) else {
            return halt_unauthenticated();
        };

        match self.token_service.verify_access(token) {
            Some(claims) => {
                ctx.set_user_id(claims.sub);
                Outcome::Continue
            }
            None => halt_unauthenticated(),
        }
    }
}

/// ロールゲートインターセプター
///
/// Pipeline<Authenticated> からしか構築されないため user_id は必ず
/// 書き込み済み（型状態で保証）。ユーザー行をロードし、ブロック済み
/// またはロール外なら 403 で短絡する。
pub struct RequireRole {
    user_repo: UserRepository,
    roles: &'static [Role],
}

impl RequireRole {
    pub fn new(user_repo: UserRepository, roles: &'static [Role]) -> Self {
        Self { user_repo, roles }
    }
}

#[async_trait]
impl Interceptor for RequireRole {
    async fn call(&self, ctx: &mut RequestContext) -> Outcome {
        let Some(user_id) = ctx.user_id() else {
            return halt_unauthenticated();
        };

        let user = match self.user_repo.find_by_id(user_id).await {
            Ok(Some(user)) => user,
            // トークンは有効だがユーザーが消えている
            Ok(None) => return halt_unauthenticated(),
            Err(e) => return Outcome::Halt(AppError::from(e).into_response()),
        };

        if user.blocked {
            tracing::warn!(user_id = %user.id, "アクセス拒否: ブロック済みアカウント");
            return Outcome::Halt(
                AppError::Authorization("Votre compte est bloqué".to_string()).into_response(),
            );
        }

        if !self.roles.contains(&user.role) {
            tracing::warn!(user_id = %user.id, role = ?user.role, "アクセス拒否: ロール不足");
            return Outcome::Halt(
                AppError::Authorization("Accès refusé".to_string()).into_response(),
            );
        }

        Outcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;
    use axum::http::{HeaderValue, StatusCode};
    use uuid::Uuid;

    use super::*;

    /// RequireRole のテストには PgPool が必要なため、Authenticate のみテスト
    fn token_service() -> TokenService {
        TokenService::from_secrets(
            "access-secret-for-tests",
            900,
            "refresh-secret-for-tests",
            604_800,
            "reset-secret-for-tests",
            600,
        )
    }

    fn ctx_with_bearer(token: &str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        RequestContext::new(headers, Bytes::new())
    }

    #[tokio::test]
    async fn test_valid_access_token_continues_and_sets_user_id() {
        let service = token_service();
        let user_id = Uuid::new_v4();
        let token = service.issue_access(user_id).unwrap();

        let mut ctx = ctx_with_bearer(&token);
        let authenticate = Authenticate::new(service);

        match authenticate.call(&mut ctx).await {
            Outcome::Continue => {}
            Outcome::Halt(_) => panic!("expected continue"),
        }
        assert_eq!(ctx.user_id(), Some(user_id));
    }

    #[tokio::test]
    async fn test_missing_header_halts_with_401() {
        let mut ctx = RequestContext::new(HeaderMap::new(), Bytes::new());
        let authenticate = Authenticate::new(token_service());

        match authenticate.call(&mut ctx).await {
            Outcome::Halt(response) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
            Outcome::Continue => panic!("expected halt"),
        }
        assert!(ctx.user_id().is_none());
    }

    #[tokio::test]
    async fn test_malformed_header_halts_with_401() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        let mut ctx = RequestContext::new(headers, Bytes::new());
        let authenticate = Authenticate::new(token_service());

        match authenticate.call(&mut ctx).await {
            Outcome::Halt(response) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
            Outcome::Continue => panic!("expected halt"),
        }
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_here() {
        // 署名は正しいが kind が違うトークンの使い回しは拒否
        let service = token_service();
        let refresh = service.issue_refresh(Uuid::new_v4()).unwrap();

        let mut ctx = ctx_with_bearer(&refresh);
        let authenticate = Authenticate::new(service);

        match authenticate.call(&mut ctx).await {
            Outcome::Halt(response) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
            Outcome::Continue => panic!("expected halt"),
        }
        assert!(ctx.user_id().is_none());
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let mut ctx = ctx_with_bearer("invalid.token.here");
        let authenticate = Authenticate::new(token_service());

        match authenticate.call(&mut ctx).await {
            Outcome::Halt(response) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
            Outcome::Continue => panic!("expected halt"),
        }
    }
}
