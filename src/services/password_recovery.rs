use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{OtpRepository, UserRepository};
use crate::services::{EmailService, TokenService, auth::hash_password};

/// OTPベースのパスワード復旧サービス
///
/// フロー: forgot-password でOTP発行・メール送信 → verify-otp でOTPを
/// 消費して reset トークン発行 → reset-password でパスワード更新。
#[derive(Clone)]
pub struct PasswordRecoveryService {
    user_repo: UserRepository,
    otp_repo: OtpRepository,
    email_service: EmailService,
    token_service: TokenService,
    config: Arc<Config>,
}

impl PasswordRecoveryService {
    pub fn new(
        user_repo: UserRepository,
        otp_repo: OtpRepository,
        email_service: EmailService,
        token_service: TokenService,
        config: Arc<Config>,
    ) -> Self {
        Self {
            user_repo,
            otp_repo,
            email_service,
            token_service,
            config,
        }
    }

    /// OTPを発行してメール送信
    ///
    /// # Security
    /// - ユーザーが存在しない場合も常に成功を返す（存在有無の漏洩防止）
    /// - OTPコードはログに出力しない
    pub async fn request_otp(&self, email: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "OTP発行リクエスト");

        let user = match self.user_repo.find_by_email(email).await? {
            Some(u) => u,
            None => {
                tracing::info!(email = %email, "OTP発行: ユーザー不在（成功レスポンス返却）");
                return Ok(());
            }
        };

        let code = generate_otp_code();
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(self.config.otp_ttl_secs);

        // 既存の未使用OTPを無効化してから挿入（有効コードは常に高々1つ）
        self.otp_repo
            .replace_active(user.id, &code, expires_at)
            .await?;

        // メール送信失敗は500として伝播（リトライしない）
        self.email_service.send_otp_email(&user.email, &code).await?;

        tracing::info!(user_id = %user.id, "OTPメール送信完了");

        Ok(())
    }

    /// OTPを検証して reset トークンを発行
    ///
    /// OTPは単回使用: 検証成功と同時に used になり、同じコードの
    /// 再送信は失敗する。
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("Utilisateur introuvable".to_string()))?;

        if !self.otp_repo.consume(user.id, otp).await? {
            tracing::warn!(user_id = %user.id, "OTP検証失敗");
            return Err(AppError::OtpInvalid);
        }

        tracing::info!(user_id = %user.id, "OTP検証成功");

        self.token_service.issue_reset(user.id)
    }

    /// reset トークンを検証してパスワードを更新
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let claims = self.token_service.verify_reset(reset_token).ok_or_else(|| {
            AppError::Authentication("Reset token invalide ou expiré".to_string())
        })?;

        let password_hash = hash_password(new_password)?;
        self.user_repo
            .update_password(claims.sub, &password_hash)
            .await?;

        tracing::info!(user_id = %claims.sub, "パスワードリセット完了");

        Ok(())
    }
}

/// 4桁のOTPコードを生成（1000〜9999、9000通り）
///
/// エントロピーは意図的に小さい。総当たりへの緩和は有効期限と
/// 単回使用であり、暗号強度ではない（DESIGN.md の受容済み制限を参照）。
pub(crate) fn generate_otp_code() -> String {
    rand::Rng::gen_range(&mut rand::thread_rng(), 1000..=9999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// PasswordRecoveryService のインスタンス化には PgPool が必要なため、
    /// コード生成のみテスト（単回使用・上書き無効化はSQL側の不変条件）
    #[test]
    fn test_otp_code_is_four_digits_in_range() {
        for _ in 0..200 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            let n: u32 = code.parse().unwrap();
            assert!((1000..=9999).contains(&n));
        }
    }
}
