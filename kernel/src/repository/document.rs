use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{document::Document, id::DocumentId};

#[mockall::automock]
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_id(&self, id: DocumentId) -> AppResult<Option<Document>>;
    async fn find_all(&self) -> AppResult<Vec<Document>>;
    // Case-insensitive substring searches.
    async fn find_by_title(&self, title: &str) -> AppResult<Vec<Document>>;
    async fn find_by_author(&self, author: &str) -> AppResult<Vec<Document>>;
    async fn find_by_genre(&self, genre: &str) -> AppResult<Vec<Document>>;
    // Documents with at least one copy on the shelf.
    async fn find_available(&self) -> AppResult<Vec<Document>>;
    async fn create(&self, document: Document) -> AppResult<()>;
    async fn update(&self, document: Document) -> AppResult<()>;
    // Conditional write of the availability counter alone.
    async fn update_quantity(&self, id: DocumentId, available: u32) -> AppResult<()>;
    async fn delete(&self, id: DocumentId) -> AppResult<()>;
}
