use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;

/// メール送信サービス
///
/// email feature 有効時は lettre によるSMTP送信、
/// 無効時は開発用スタブ（ログ出力のみ）。
#[derive(Clone)]
pub struct EmailService {
    config: Arc<Config>,
}

impl EmailService {
    /// 新しい EmailService を作成
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// パスワード復旧用OTPコードをメール送信
    pub async fn send_otp_email(&self, to: &str, code: &str) -> Result<(), AppError> {
        let subject = "Votre code de vérification";
        let body = format!(
            "Votre code de vérification est : {}\n\
             Ce code expire dans {} minutes.\n\n\
             Si vous n'êtes pas à l'origine de cette demande, ignorez cet email.",
            code,
            self.config.otp_ttl_secs / 60
        );

        self.send(to, subject, body).await
    }

    /// SMTP送信（email feature 有効時）
    #[cfg(feature = "email")]
    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), AppError> {
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
        use secrecy::ExposeSecret;

        let host = self
            .config
            .smtp_host
            .as_deref()
            .ok_or_else(|| AppError::Email("SMTP_HOST non configuré".to_string()))?;
        let from = self
            .config
            .smtp_from_address
            .as_deref()
            .ok_or_else(|| AppError::Email("SMTP_FROM_ADDRESS non configuré".to_string()))?;

        let message = Message::builder()
            .from(from
                .parse()
                .map_err(|e| AppError::Email(format!("adresse expéditeur invalide: {e}")))?)
            .to(to
                .parse()
                .map_err(|e| AppError::Email(format!("adresse destinataire invalide: {e}")))?)
            .subject(subject)
            .body(body)
            .map_err(|e| AppError::Email(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AppError::Email(e.to_string()))?
            .port(self.config.smtp_port);

        if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            builder = builder.credentials(Credentials::new(
                username.expose_secret().clone(),
                password.expose_secret().clone(),
            ));
        }

        builder
            .build()
            .send(message)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        tracing::info!(to = %to, "メール送信完了");

        Ok(())
    }

    /// 開発モード: メール送信せずログ出力のみ
    #[cfg(not(feature = "email"))]
    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), AppError> {
        tracing::info!(to = %to, subject = %subject, "メール送信（開発モード）");
        tracing::info!("本文:\n{}", body);

        // SMTP設定の有無だけ確認しておく（本番は email feature でビルドすること）
        let _smtp_configured = self.config.smtp_host.is_some()
            && self.config.smtp_from_address.is_some();

        Ok(())
    }
}
