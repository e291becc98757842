use async_trait::async_trait;
use chrono::NaiveDate;
use shared::error::AppResult;

use crate::model::{
    id::{DocumentId, LoanId, MemberId},
    loan::LoanTransaction,
};

/// The loan store is the authoritative record of what is out on loan; deletion
/// eligibility is always answered from here, never from the availability
/// counters.
#[mockall::automock]
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn find_by_id(&self, id: LoanId) -> AppResult<Option<LoanTransaction>>;
    async fn find_all(&self) -> AppResult<Vec<LoanTransaction>>;
    async fn create(&self, loan: LoanTransaction) -> AppResult<()>;
    async fn update(&self, loan: LoanTransaction) -> AppResult<()>;
    async fn delete(&self, id: LoanId) -> AppResult<()>;
    // Open = status Active or Renewed.
    async fn find_open_by_member(&self, member_id: MemberId) -> AppResult<Vec<LoanTransaction>>;
    async fn find_open_by_document(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Vec<LoanTransaction>>;
    // Full history including closed loans.
    async fn find_by_member(&self, member_id: MemberId) -> AppResult<Vec<LoanTransaction>>;
    async fn find_by_document(&self, document_id: DocumentId) -> AppResult<Vec<LoanTransaction>>;
    // Open loans whose due date has passed.
    async fn find_overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanTransaction>>;
}
