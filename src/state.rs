use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::repositories::{OtpRepository, UserRepository};
use crate::services::{EmailService, TokenService};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーリポジトリ
    pub user_repo: UserRepository,
    /// OTPリポジトリ
    pub otp_repo: OtpRepository,
    /// メールサービス
    pub email_service: EmailService,
    /// トークンサービス
    pub token_service: TokenService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        let config = Arc::new(config);
        let user_repo = UserRepository::new(db_pool.clone());
        let otp_repo = OtpRepository::new(db_pool.clone());
        let email_service = EmailService::new(config.clone());
        let token_service = TokenService::new(&config);

        Self {
            db_pool,
            config,
            user_repo,
            otp_repo,
            email_service,
            token_service,
        }
    }
}
