use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo::{Document, DocumentStore, NewDocument};
use crate::users::StoreError;

#[derive(Default)]
pub struct MemoryDocumentStore {
    rows: Mutex<Vec<Document>>,
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Document>, StoreError> {
        let rows = self.rows.lock().expect("document store lock");
        let mut own: Vec<Document> = rows.iter().filter(|d| d.user_id == user_id).cloned().collect();
        own.sort_by(|a, b| b.upload_date.cmp(&a.upload_date).then(b.id.cmp(&a.id)));
        Ok(own)
    }

    async fn insert(&self, user_id: i64, new: NewDocument<'_>) -> Result<Document, StoreError> {
        let mut rows = self.rows.lock().expect("document store lock");
        let doc = Document {
            id: rows.iter().map(|d| d.id).max().unwrap_or(0) + 1,
            user_id,
            filename: new.filename.to_string(),
            file_path: new.file_path.to_string(),
            upload_date: OffsetDateTime::now_utc(),
        };
        rows.push(doc.clone());
        Ok(doc)
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().expect("document store lock");
        let before = rows.len();
        rows.retain(|d| !(d.id == id && d.user_id == user_id));
        Ok(rows.len() != before)
    }
}
