use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::models::Role;
use crate::pipeline::auth::{Authenticate, RequireRole};
use crate::pipeline::context::RequestContext;
use crate::pipeline::validate::{Schema, Validate};
use crate::repositories::UserRepository;
use crate::services::TokenService;

/// インターセプターの実行結果
///
/// Halt は最終応答そのもの。以降のステップとターミナルハンドラーは
/// 実行されない。
pub enum Outcome {
    Continue,
    Halt(Response),
}

/// リクエストインターセプター
///
/// コンテキストを検査・書き込みし、チェーン続行か短絡応答かを返す。
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> Outcome;
}

/// 未認証ステージ（型状態マーカー）
pub struct Anonymous;
/// 認証済みステージ（型状態マーカー）
pub struct Authenticated;

/// ミドルウェアパイプライン
///
/// インターセプターを宣言順に直列実行し、最初の Halt で打ち切る。
/// Stage は型状態: `require_role` は `authenticate` 後にしか構築できず、
/// 順序ミス（認証前のロールチェック）はコンパイルエラーになる。
/// パイプラインとコンテキストはリクエストごとに作られ、共有されない。
pub struct Pipeline<Stage = Anonymous> {
    steps: Vec<Box<dyn Interceptor>>,
    _stage: PhantomData<Stage>,
}

impl Pipeline<Anonymous> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            _stage: PhantomData,
        }
    }

    /// Bearer アクセストークン検証を追加し、認証済みステージへ遷移
    pub fn authenticate(mut self, token_service: TokenService) -> Pipeline<Authenticated> {
        self.steps.push(Box::new(Authenticate::new(token_service)));
        Pipeline {
            steps: self.steps,
            _stage: PhantomData,
        }
    }
}

impl Default for Pipeline<Anonymous> {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline<Authenticated> {
    /// ロールゲートを追加（認証済みステージでのみ構築可能）
    pub fn require_role(mut self, user_repo: UserRepository, roles: &'static [Role]) -> Self {
        self.steps.push(Box::new(RequireRole::new(user_repo, roles)));
        self
    }
}

impl<Stage> Pipeline<Stage> {
    /// スキーマバリデーションを追加
    pub fn validate(mut self, schema: Schema) -> Self {
        self.steps.push(Box::new(Validate::new(schema)));
        self
    }

    /// 任意のインターセプターを追加
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.steps.push(Box::new(interceptor));
        self
    }

    /// チェーンを実行し、ターミナルハンドラーで締める
    ///
    /// 各ステップは宣言順に直列実行。Halt が返った時点でそれが最終応答。
    /// 全ステップが Continue ならハンドラーが実行され、その結果
    /// （成功応答または AppError 由来のエラー応答）が返る。
    pub async fn run<F, Fut>(self, mut ctx: RequestContext, handler: F) -> Response
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<Response, AppError>>,
    {
        for step in &self.steps {
            match step.call(&mut ctx).await {
                Outcome::Continue => {}
                Outcome::Halt(response) => return response,
            }
        }

        match handler(ctx).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode};

    use super::*;
    use crate::envelope::Envelope;

    /// 呼び出し回数を記録するテストダブル
    struct Recorder {
        calls: Arc<AtomicUsize>,
        halt: bool,
    }

    #[async_trait]
    impl Interceptor for Recorder {
        async fn call(&self, _ctx: &mut RequestContext) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.halt {
                Outcome::Halt(StatusCode::IM_A_TEAPOT.into_response())
            } else {
                Outcome::Continue
            }
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(HeaderMap::new(), Bytes::new())
    }

    #[tokio::test]
    async fn test_all_continue_reaches_handler() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let handled = Arc::new(AtomicUsize::new(0));

        let pipeline = Pipeline::new()
            .with(Recorder {
                calls: first.clone(),
                halt: false,
            })
            .with(Recorder {
                calls: second.clone(),
                halt: false,
            });

        let handled_in_handler = handled.clone();
        let response = pipeline
            .run(ctx(), |_ctx| async move {
                handled_in_handler.fetch_add(1, Ordering::SeqCst);
                Ok(Envelope::success("ok").into_response())
            })
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_halt_short_circuits_chain_and_handler() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let handled = Arc::new(AtomicUsize::new(0));

        let pipeline = Pipeline::new()
            .with(Recorder {
                calls: first.clone(),
                halt: true,
            })
            .with(Recorder {
                calls: second.clone(),
                halt: false,
            });

        let handled_in_handler = handled.clone();
        let response = pipeline
            .run(ctx(), |_ctx| async move {
                handled_in_handler.fetch_add(1, Ordering::SeqCst);
                Ok(Envelope::success("ok").into_response())
            })
            .await;

        // 最初の Halt がそのまま最終応答になり、後続は一切実行されない
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert_eq!(handled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_error_response() {
        let response = Pipeline::new()
            .run(ctx(), |_ctx| async move {
                Err(AppError::NotFound("Utilisateur introuvable".to_string()))
            })
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
