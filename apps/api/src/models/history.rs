use sqlx::FromRow;

/// One saved generation. `curriculum` is the serialized parse result.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: i64,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub timestamp: String,
    pub skill: String,
    pub duration: String,
    pub curriculum: String,
}
