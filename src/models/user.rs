use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// ユーザーロール
///
/// ダッシュボードへのログインは ADMIN のみ許可。
/// その他のロールはアクセストークンの発行対象にはなるが、
/// ロールゲート付きエンドポイントで制限される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sqlx(rename = "ADMIN")]
    Admin,
    #[sqlx(rename = "MANAGER")]
    Manager,
    #[sqlx(rename = "RESPONSABLE_CAISSES")]
    ResponsableCaisses,
    #[sqlx(rename = "CAISSIER")]
    Caissier,
}

#[derive(Debug, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub blocked: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        let value = serde_json::to_value(Role::ResponsableCaisses).unwrap();
        assert_eq!(value, "RESPONSABLE_CAISSES");
        let value = serde_json::to_value(Role::Admin).unwrap();
        assert_eq!(value, "ADMIN");
    }
}
