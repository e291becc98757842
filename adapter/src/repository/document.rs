use std::collections::HashMap;

use async_trait::async_trait;
use kernel::model::{document::Document, id::DocumentId};
use kernel::repository::document::DocumentRepository;
use shared::error::{AppError, AppResult};
use tokio::sync::RwLock;

use super::contains_ignore_case;

#[derive(Default)]
pub struct InMemoryDocumentRepository {
    rows: RwLock<HashMap<DocumentId, Document>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered(&self, predicate: impl Fn(&Document) -> bool) -> Vec<Document> {
        self.rows
            .read()
            .await
            .values()
            .filter(|d| predicate(d))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn find_by_id(&self, id: DocumentId) -> AppResult<Option<Document>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<Document>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Vec<Document>> {
        Ok(self.filtered(|d| contains_ignore_case(&d.title, title)).await)
    }

    async fn find_by_author(&self, author: &str) -> AppResult<Vec<Document>> {
        Ok(self
            .filtered(|d| contains_ignore_case(&d.author, author))
            .await)
    }

    async fn find_by_genre(&self, genre: &str) -> AppResult<Vec<Document>> {
        Ok(self.filtered(|d| contains_ignore_case(&d.genre, genre)).await)
    }

    async fn find_available(&self) -> AppResult<Vec<Document>> {
        Ok(self.filtered(|d| d.is_available()).await)
    }

    async fn create(&self, document: Document) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&document.id) {
            return Err(AppError::InvalidState(format!(
                "document {} already exists",
                document.id
            )));
        }
        rows.insert(document.id, document);
        Ok(())
    }

    async fn update(&self, document: Document) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&document.id) {
            return Err(AppError::not_found("document", document.id));
        }
        rows.insert(document.id, document);
        Ok(())
    }

    async fn update_quantity(&self, id: DocumentId, available: u32) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let document = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("document", id))?;
        // Re-derive through the entity so the available <= total clamp holds.
        let total = document.total_quantity();
        if available > total {
            return Err(AppError::InvalidState(format!(
                "available {available} exceeds total {total} for document {id}"
            )));
        }
        while document.available_quantity() > available {
            document.borrow_one()?;
        }
        while document.available_quantity() < available {
            document.return_one();
        }
        Ok(())
    }

    async fn delete(&self, id: DocumentId) -> AppResult<()> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("document", id))
    }
}
