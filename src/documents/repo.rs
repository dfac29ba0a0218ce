use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::users::StoreError;

/// Metadata for a file the user uploaded elsewhere; the file itself is not stored here.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Document {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub filename: String,
    pub file_path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
}

#[derive(Debug, Clone, Copy)]
pub struct NewDocument<'a> {
    pub filename: &'a str,
    pub file_path: &'a str,
}

/// Every operation is scoped to the owning user.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Newest first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Document>, StoreError>;
    async fn insert(&self, user_id: i64, new: NewDocument<'_>) -> Result<Document, StoreError>;
    /// `false` when no document with that id belongs to the user.
    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, filename, file_path, upload_date
            FROM documents
            WHERE user_id = $1
            ORDER BY upload_date DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, user_id: i64, new: NewDocument<'_>) -> Result<Document, StoreError> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (user_id, filename, file_path)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, filename, file_path, upload_date
            "#,
        )
        .bind(user_id)
        .bind(new.filename)
        .bind(new.file_path)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM documents WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
