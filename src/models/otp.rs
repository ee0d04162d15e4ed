use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// OTPコード行
///
/// ユーザーごとに「未使用かつ未失効」の行は高々1つ。
/// 新規発行時に既存の未使用行をすべて used にすることで保証する
/// （OtpRepository::replace_active 参照）。
/// 失効済み行の物理削除は delete_expired による外部スイープに任せる。
#[derive(Debug, FromRow, Serialize)]
pub struct OtpCode {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip)]
    pub code: String,
    pub used: bool,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}
