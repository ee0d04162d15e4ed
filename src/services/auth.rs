use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserRepository;

/// 認証失敗時の統一メッセージ
///
/// 「ユーザー不在」と「パスワード不一致」で同一文言を返す
/// （ユーザー列挙攻撃の防止）。
pub const INVALID_CREDENTIALS: &str = "Identifiants incorrects";

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// パスワードを検証
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
        AppError::Internal(anyhow::anyhow!("password hash parse error"))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 認証サービス
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// 資格情報を検証してユーザーを返す
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<User, AppError> {
        let user = self.user_repo.find_by_email(identifier).await?;

        match user {
            Some(user) => {
                if verify_password(password, &user.password_hash)? {
                    tracing::info!(user_id = %user.id, "認証成功");
                    Ok(user)
                } else {
                    tracing::warn!(identifier = %identifier, "認証失敗: パスワード不一致");
                    Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()))
                }
            }
            None => {
                // タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
                // これにより、ユーザーの存在有無を応答時間から推測できなくなる
                let dummy_hash = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$RWh6";
                let _ = verify_password(password, dummy_hash);
                tracing::warn!(identifier = %identifier, "認証失敗: ユーザー不在");
                Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()))
            }
        }
    }

    /// 認証済みユーザー自身のパスワード変更
    ///
    /// 現在のパスワードが一致しない場合は 401
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("Non authentifié".to_string()))?;

        if !verify_password(current_password, &user.password_hash)? {
            tracing::warn!(user_id = %user_id, "パスワード変更失敗: 現在のパスワード不一致");
            return Err(AppError::Authentication(
                "Mot de passe actuel incorrect".to_string(),
            ));
        }

        let password_hash = hash_password(new_password)?;
        self.user_repo.update_password(user_id, &password_hash).await?;

        tracing::info!(user_id = %user_id, "パスワード変更完了");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// AuthService のインスタンス化には PgPool が必要なため、
    /// ハッシュ関数を直接テスト
    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("motdepasse123").unwrap();
        assert!(verify_password("motdepasse123", &hash).unwrap());
        assert!(!verify_password("autre-mot-de-passe", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_format_is_error() {
        let result = verify_password("motdepasse123", "invalid_hash_format");
        assert!(result.is_err());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("motdepasse123").unwrap();
        let second = hash_password("motdepasse123").unwrap();
        assert_ne!(first, second);
    }
}
