use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    id::{DocumentId, MemberId, ReviewId},
    review::Review,
};

#[mockall::automock]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn find_by_id(&self, id: ReviewId) -> AppResult<Option<Review>>;
    async fn find_by_document(&self, document_id: DocumentId) -> AppResult<Vec<Review>>;
    async fn find_by_member(&self, member_id: MemberId) -> AppResult<Vec<Review>>;
    async fn create(&self, review: Review) -> AppResult<()>;
    async fn update(&self, review: Review) -> AppResult<()>;
    async fn delete(&self, id: ReviewId) -> AppResult<()>;
    // Cascade hooks used by document/member removal.
    async fn delete_by_document(&self, document_id: DocumentId) -> AppResult<()>;
    async fn delete_by_member(&self, member_id: MemberId) -> AppResult<()>;
}
