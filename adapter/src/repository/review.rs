use std::collections::HashMap;

use async_trait::async_trait;
use kernel::model::{
    id::{DocumentId, MemberId, ReviewId},
    review::Review,
};
use kernel::repository::review::ReviewRepository;
use shared::error::{AppError, AppResult};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryReviewRepository {
    rows: RwLock<HashMap<ReviewId, Review>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn find_by_id(&self, id: ReviewId) -> AppResult<Option<Review>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_by_document(&self, document_id: DocumentId) -> AppResult<Vec<Review>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn find_by_member(&self, member_id: MemberId) -> AppResult<Vec<Review>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn create(&self, review: Review) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&review.id) {
            return Err(AppError::InvalidState(format!(
                "review {} already exists",
                review.id
            )));
        }
        rows.insert(review.id, review);
        Ok(())
    }

    async fn update(&self, review: Review) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&review.id) {
            return Err(AppError::not_found("review", review.id));
        }
        rows.insert(review.id, review);
        Ok(())
    }

    async fn delete(&self, id: ReviewId) -> AppResult<()> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("review", id))
    }

    async fn delete_by_document(&self, document_id: DocumentId) -> AppResult<()> {
        self.rows
            .write()
            .await
            .retain(|_, r| r.document_id != document_id);
        Ok(())
    }

    async fn delete_by_member(&self, member_id: MemberId) -> AppResult<()> {
        self.rows.write().await.retain(|_, r| r.member_id != member_id);
        Ok(())
    }
}
