use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use kernel::model::{
    id::{DocumentId, LoanId, MemberId},
    loan::LoanTransaction,
};
use kernel::repository::loan::LoanRepository;
use shared::error::{AppError, AppResult};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryLoanRepository {
    rows: RwLock<HashMap<LoanId, LoanTransaction>>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered(&self, predicate: impl Fn(&LoanTransaction) -> bool) -> Vec<LoanTransaction> {
        self.rows
            .read()
            .await
            .values()
            .filter(|l| predicate(l))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn find_by_id(&self, id: LoanId) -> AppResult<Option<LoanTransaction>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<LoanTransaction>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn create(&self, loan: LoanTransaction) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&loan.id) {
            return Err(AppError::InvalidState(format!(
                "loan {} already exists",
                loan.id
            )));
        }
        rows.insert(loan.id, loan);
        Ok(())
    }

    async fn update(&self, loan: LoanTransaction) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&loan.id) {
            return Err(AppError::not_found("loan", loan.id));
        }
        rows.insert(loan.id, loan);
        Ok(())
    }

    async fn delete(&self, id: LoanId) -> AppResult<()> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("loan", id))
    }

    async fn find_open_by_member(&self, member_id: MemberId) -> AppResult<Vec<LoanTransaction>> {
        Ok(self
            .filtered(|l| l.member_id == member_id && l.is_open())
            .await)
    }

    async fn find_open_by_document(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Vec<LoanTransaction>> {
        Ok(self
            .filtered(|l| l.document_id == document_id && l.is_open())
            .await)
    }

    async fn find_by_member(&self, member_id: MemberId) -> AppResult<Vec<LoanTransaction>> {
        Ok(self.filtered(|l| l.member_id == member_id).await)
    }

    async fn find_by_document(&self, document_id: DocumentId) -> AppResult<Vec<LoanTransaction>> {
        Ok(self.filtered(|l| l.document_id == document_id).await)
    }

    async fn find_overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanTransaction>> {
        // Open and past due; loans already closed as Overdue stay out.
        Ok(self.filtered(|l| l.is_open() && l.is_overdue(today)).await)
    }
}
