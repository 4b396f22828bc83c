use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub token: String,
    pub user_id: Option<i64>,
    pub guest_generations: i64,
}
