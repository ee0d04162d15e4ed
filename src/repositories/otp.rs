use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::OtpCode;

#[derive(Clone)]
pub struct OtpRepository {
    pool: PgPool,
}

impl OtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 既存の未使用コードをすべて無効化してから新しいコードを挿入する
    ///
    /// 不変条件: ユーザーごとに有効なコードは高々1つ。
    /// 同一ユーザーへの同時リクエストは advisory lock で直列化する
    /// （UPDATE だけでは互いの INSERT を待てず、有効コードが2つ残り得る）。
    pub async fn replace_active(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<OtpCode, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // トランザクション終了まで保持されるユーザー単位のロック
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE otp_codes
            SET used = TRUE
            WHERE user_id = $1 AND used = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let otp = sqlx::query_as::<_, OtpCode>(
            r#"
            INSERT INTO otp_codes (user_id, code, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, code, used, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(otp)
    }

    /// 未使用かつ未失効のコードを消費する
    ///
    /// 一致する行があれば used にして true を返す。
    /// 単一の UPDATE 文なので同一コードの二重消費は起こらない
    /// （2回目は WHERE 句に一致せず false）。
    pub async fn consume(&self, user_id: Uuid, code: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE otp_codes
            SET used = TRUE
            WHERE user_id = $1
              AND code = $2
              AND used = FALSE
              AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 期限切れコードを削除（定期スイープ用、リクエスト経路では呼ばない）
    ///
    /// # Returns
    /// 削除された行数
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM otp_codes
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
