use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{Duration, NaiveDate, Utc};
use derive_new::new;
use shared::config::CirculationPolicy;
use shared::error::{AppError, AppResult};
use tokio::sync::Mutex as AsyncMutex;

use crate::model::{
    document::{
        event::{CreateDocument, UpdateDocument},
        Document,
    },
    id::{DocumentId, LoanId, MemberId},
    loan::{LoanStatus, LoanTransaction},
    member::{
        event::{CreateMember, UpdateMember},
        Member,
    },
};
use crate::repository::{
    document::DocumentRepository, loan::LoanRepository, member::MemberRepository,
    review::ReviewRepository,
};

/// Outcome of a return, carrying everything a caller needs to report it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnReceipt {
    pub loan_id: LoanId,
    pub status: LoanStatus,
    pub fine_amount: f64,
    pub returned_on: NaiveDate,
}

/// Keyed async mutexes. Stale entries (nobody holds or waits on the lock)
/// are pruned on every acquisition, so the table never outgrows the set of
/// keys currently in use.
struct LockTable<K> {
    locks: StdMutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }
}

impl<K: std::hash::Hash + Eq + Copy> LockTable<K> {
    fn acquire(&self, key: K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key).or_default())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().expect("lock table poisoned").len()
    }
}

/// The circulation engine. Each operation is one unit of work across the
/// document, member, and loan stores: writes are applied in a fixed order and
/// compensated in reverse when a later write fails, so a partial failure never
/// leaves the three stores disagreeing about what is on loan.
///
/// Serialization: operations that read-modify-write a member take that
/// member's lock; operations that touch a document's availability or its
/// loans take that document's lock. Where both are held the member lock is
/// always taken first, so lock order is fixed and deadlock-free.
#[derive(new)]
pub struct CirculationService {
    documents: Arc<dyn DocumentRepository>,
    members: Arc<dyn MemberRepository>,
    loans: Arc<dyn LoanRepository>,
    reviews: Arc<dyn ReviewRepository>,
    policy: CirculationPolicy,
    #[new(default)]
    document_locks: LockTable<DocumentId>,
    #[new(default)]
    member_locks: LockTable<MemberId>,
}

impl CirculationService {
    pub fn policy(&self) -> CirculationPolicy {
        self.policy
    }

    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    // ------------------------------------------------------------------
    // Lending
    // ------------------------------------------------------------------

    /// Lends one copy of a document to a member. Preconditions are checked in
    /// a fixed order and the first failure wins: the member must exist and be
    /// active, be below their borrow limit, and the document must exist with
    /// a copy available.
    pub async fn borrow(&self, member_id: MemberId, document_id: DocumentId) -> AppResult<LoanId> {
        let member_lock = self.member_locks.acquire(member_id);
        let _member_guard = member_lock.lock().await;
        let document_lock = self.document_locks.acquire(document_id);
        let _document_guard = document_lock.lock().await;

        let mut member = self
            .members
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::not_found("member", member_id))?;
        if !member.active {
            return Err(AppError::InactiveMember {
                member_id: member_id.to_string(),
            });
        }
        if member.borrowed_count() >= member.max_borrow_limit {
            return Err(AppError::LimitExceeded(format!(
                "member {member_id} has reached the borrow limit of {}",
                member.max_borrow_limit
            )));
        }

        let mut document = self
            .documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::not_found("document", document_id))?;
        if !document.is_available() {
            return Err(AppError::Unavailable {
                document_id: document_id.to_string(),
            });
        }

        let member_before = member.clone();
        member.borrow_document(document_id)?;
        document.borrow_one()?;

        let today = self.today();
        let loan = LoanTransaction::new(
            LoanId::new(),
            member_id,
            document_id,
            today,
            today + Duration::days(self.policy.default_loan_days),
        );
        let loan_id = loan.id;

        // Unit of work: loan -> member -> availability.
        self.loans.create(loan).await?;
        if let Err(err) = self.members.update(member).await {
            self.undo_loan_create(loan_id).await;
            return Err(err);
        }
        if let Err(err) = self
            .documents
            .update_quantity(document_id, document.available_quantity())
            .await
        {
            self.undo_member_update(member_before).await;
            self.undo_loan_create(loan_id).await;
            return Err(err);
        }

        tracing::info!(%loan_id, %member_id, %document_id, "document borrowed");
        Ok(loan_id)
    }

    /// Closes an open loan: freezes the fine, releases the member's slot, and
    /// puts the copy back on the shelf.
    pub async fn return_loan(&self, loan_id: LoanId) -> AppResult<ReturnReceipt> {
        // First load is only to learn which member and document to serialize on.
        let loan = self
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::not_found("loan", loan_id))?;
        let member_lock = self.member_locks.acquire(loan.member_id);
        let _member_guard = member_lock.lock().await;
        let document_lock = self.document_locks.acquire(loan.document_id);
        let _document_guard = document_lock.lock().await;

        // Re-read under the locks so a racing return of the same loan is seen.
        let mut loan = self
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::not_found("loan", loan_id))?;
        let loan_before = loan.clone();
        let today = self.today();
        loan.close(today, self.policy.daily_fine_rate)?;
        let receipt = ReturnReceipt {
            loan_id,
            status: loan.status(),
            fine_amount: loan.fine_amount(),
            returned_on: today,
        };

        self.loans.update(loan.clone()).await?;

        let member = match self.members.find_by_id(loan.member_id).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                self.undo_loan_update(loan_before).await;
                return Err(self.consistency_violation(format!(
                    "loan {loan_id} references missing member {}",
                    loan.member_id
                )));
            }
            Err(err) => {
                self.undo_loan_update(loan_before).await;
                return Err(err);
            }
        };
        let member_before = member.clone();
        let mut member = member;
        if !member.return_document(loan.document_id) {
            tracing::warn!(
                member_id = %member.id,
                document_id = %loan.document_id,
                "borrowed set did not contain the returned document"
            );
        }
        if let Err(err) = self.members.update(member).await {
            self.undo_loan_update(loan_before).await;
            return Err(err);
        }

        match self.documents.find_by_id(loan.document_id).await {
            Ok(Some(mut document)) => {
                document.return_one();
                if let Err(err) = self
                    .documents
                    .update_quantity(document.id, document.available_quantity())
                    .await
                {
                    self.undo_member_update(member_before).await;
                    self.undo_loan_update(loan_before).await;
                    return Err(err);
                }
            }
            Ok(None) => {
                self.undo_member_update(member_before).await;
                self.undo_loan_update(loan_before).await;
                return Err(self.consistency_violation(format!(
                    "loan {loan_id} references missing document {}",
                    loan.document_id
                )));
            }
            Err(err) => {
                self.undo_member_update(member_before).await;
                self.undo_loan_update(loan_before).await;
                return Err(err);
            }
        }

        tracing::info!(
            %loan_id,
            status = ?receipt.status,
            fine = receipt.fine_amount,
            "loan returned"
        );
        Ok(receipt)
    }

    /// Extends an open loan by the policy's renewal period. Availability and
    /// the member's borrowed set are untouched.
    pub async fn renew(&self, loan_id: LoanId) -> AppResult<NaiveDate> {
        let loan = self
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::not_found("loan", loan_id))?;
        let document_lock = self.document_locks.acquire(loan.document_id);
        let _document_guard = document_lock.lock().await;

        // Re-read under the lock: a return that slipped in between the two
        // reads closed the loan, and writing the stale open copy back would
        // resurrect it.
        let mut loan = self
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::not_found("loan", loan_id))?;
        loan.renew(self.policy.renewal_days, self.policy.max_renewals)?;
        let due_on = loan.due_on();
        self.loans.update(loan).await?;
        tracing::info!(%loan_id, %due_on, "loan renewed");
        Ok(due_on)
    }

    // ------------------------------------------------------------------
    // Catalog administration
    // ------------------------------------------------------------------

    pub async fn add_document(&self, event: CreateDocument) -> AppResult<Document> {
        if event.title.trim().is_empty() {
            return Err(AppError::Validation("document title must not be blank".into()));
        }
        if event.total_quantity == 0 {
            return Err(AppError::Validation(
                "a document needs at least one copy".into(),
            ));
        }
        let document = Document::new(
            DocumentId::new(),
            event.title,
            event.author,
            event.genre,
            event.year,
            event.isbn,
            event.publisher,
            event.description,
            self.today(),
            event.total_quantity,
        );
        self.documents.create(document.clone()).await?;
        Ok(document)
    }

    pub async fn update_document(&self, event: UpdateDocument) -> AppResult<()> {
        let mut document = self
            .documents
            .find_by_id(event.document_id)
            .await?
            .ok_or_else(|| AppError::not_found("document", event.document_id))?;
        document.title = event.title;
        document.author = event.author;
        document.genre = event.genre;
        document.year = event.year;
        document.isbn = event.isbn;
        document.publisher = event.publisher;
        document.description = event.description;
        self.documents.update(document).await
    }

    /// Adds newly acquired copies to the stock.
    pub async fn restock(&self, document_id: DocumentId, quantity: u32) -> AppResult<u32> {
        if quantity == 0 {
            return Err(AppError::Validation("restock quantity must be positive".into()));
        }
        let lock = self.document_locks.acquire(document_id);
        let _guard = lock.lock().await;

        let mut document = self
            .documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::not_found("document", document_id))?;
        document.add_quantity(quantity);
        let available = document.available_quantity();
        self.documents.update(document).await?;
        Ok(available)
    }

    /// Shrinks or grows the owned stock; refused below the number of copies
    /// currently out on loan.
    pub async fn set_document_total(&self, document_id: DocumentId, total: u32) -> AppResult<()> {
        let lock = self.document_locks.acquire(document_id);
        let _guard = lock.lock().await;

        let mut document = self
            .documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::not_found("document", document_id))?;
        document.set_total_quantity(total)?;
        self.documents.update(document).await
    }

    /// Deletes a document. Eligibility is answered by the loan store, not the
    /// availability counter: any open loan blocks removal. Reviews of the
    /// document are removed with it.
    pub async fn remove_document(&self, document_id: DocumentId) -> AppResult<()> {
        let lock = self.document_locks.acquire(document_id);
        let _guard = lock.lock().await;

        if self.documents.find_by_id(document_id).await?.is_none() {
            return Err(AppError::not_found("document", document_id));
        }
        let open = self.loans.find_open_by_document(document_id).await?;
        if !open.is_empty() {
            return Err(AppError::InvalidState(format!(
                "document {document_id} has {} open loan(s)",
                open.len()
            )));
        }
        self.reviews.delete_by_document(document_id).await?;
        self.documents.delete(document_id).await?;
        tracing::info!(%document_id, "document removed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Membership administration
    // ------------------------------------------------------------------

    pub async fn register_member(&self, event: CreateMember) -> AppResult<Member> {
        if event.name.trim().is_empty() {
            return Err(AppError::Validation("member name must not be blank".into()));
        }
        let limit = event
            .max_borrow_limit
            .unwrap_or_else(|| event.kind.default_borrow_limit());
        let member = Member::new(
            MemberId::new(),
            event.name,
            event.email,
            event.kind,
            self.today(),
            limit,
        );
        self.members.create(member.clone()).await?;
        Ok(member)
    }

    pub async fn update_member(&self, event: UpdateMember) -> AppResult<()> {
        let lock = self.member_locks.acquire(event.member_id);
        let _guard = lock.lock().await;

        let mut member = self
            .members
            .find_by_id(event.member_id)
            .await?
            .ok_or_else(|| AppError::not_found("member", event.member_id))?;
        if event.max_borrow_limit < member.borrowed_count() {
            return Err(AppError::InvalidState(format!(
                "limit {} is below the {} documents currently borrowed",
                event.max_borrow_limit,
                member.borrowed_count()
            )));
        }
        member.name = event.name;
        member.email = event.email;
        member.kind = event.kind;
        member.max_borrow_limit = event.max_borrow_limit;
        self.members.update(member).await
    }

    pub async fn set_member_active(&self, member_id: MemberId, active: bool) -> AppResult<()> {
        let lock = self.member_locks.acquire(member_id);
        let _guard = lock.lock().await;

        let mut member = self
            .members
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::not_found("member", member_id))?;
        member.active = active;
        self.members.update(member).await
    }

    /// Deletes a member. Two sources of truth must both read "no outstanding
    /// loans": the loan store and the member's borrowed set. If they disagree
    /// the state is corrupt and the disagreement is surfaced, never patched
    /// over.
    pub async fn remove_member(&self, member_id: MemberId) -> AppResult<()> {
        let lock = self.member_locks.acquire(member_id);
        let _guard = lock.lock().await;

        let member = self
            .members
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::not_found("member", member_id))?;
        let open = self.loans.find_open_by_member(member_id).await?;
        if open.is_empty() != (member.borrowed_count() == 0) {
            return Err(self.consistency_violation(format!(
                "member {member_id}: loan store shows {} open loan(s) but borrowed set holds {}",
                open.len(),
                member.borrowed_count()
            )));
        }
        if !open.is_empty() {
            return Err(AppError::InvalidState(format!(
                "member {member_id} still has {} open loan(s)",
                open.len()
            )));
        }
        self.reviews.delete_by_member(member_id).await?;
        self.members.delete(member_id).await?;
        tracing::info!(%member_id, "member removed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub async fn document(&self, document_id: DocumentId) -> AppResult<Document> {
        self.documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::not_found("document", document_id))
    }

    pub async fn documents(&self) -> AppResult<Vec<Document>> {
        self.documents.find_all().await
    }

    pub async fn search_by_title(&self, title: &str) -> AppResult<Vec<Document>> {
        self.documents.find_by_title(title).await
    }

    pub async fn search_by_author(&self, author: &str) -> AppResult<Vec<Document>> {
        self.documents.find_by_author(author).await
    }

    pub async fn search_by_genre(&self, genre: &str) -> AppResult<Vec<Document>> {
        self.documents.find_by_genre(genre).await
    }

    pub async fn available_documents(&self) -> AppResult<Vec<Document>> {
        self.documents.find_available().await
    }

    pub async fn member(&self, member_id: MemberId) -> AppResult<Member> {
        self.members
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::not_found("member", member_id))
    }

    pub async fn members(&self) -> AppResult<Vec<Member>> {
        self.members.find_all().await
    }

    pub async fn loan(&self, loan_id: LoanId) -> AppResult<LoanTransaction> {
        self.loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::not_found("loan", loan_id))
    }

    pub async fn open_loans_of(&self, member_id: MemberId) -> AppResult<Vec<LoanTransaction>> {
        self.loans.find_open_by_member(member_id).await
    }

    pub async fn loan_history_of(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Vec<LoanTransaction>> {
        self.loans.find_by_document(document_id).await
    }

    pub async fn overdue_loans(&self) -> AppResult<Vec<LoanTransaction>> {
        self.loans.find_overdue(self.today()).await
    }

    // ------------------------------------------------------------------
    // Compensation
    // ------------------------------------------------------------------

    fn consistency_violation(&self, message: String) -> AppError {
        tracing::error!(%message, "consistency violation");
        AppError::ConsistencyViolation(message)
    }

    async fn undo_loan_create(&self, loan_id: LoanId) {
        if let Err(err) = self.loans.delete(loan_id).await {
            tracing::error!(%loan_id, error = %err, "compensation failed: orphan loan left behind");
        }
    }

    async fn undo_loan_update(&self, loan_before: LoanTransaction) {
        let loan_id = loan_before.id;
        if let Err(err) = self.loans.update(loan_before).await {
            tracing::error!(%loan_id, error = %err, "compensation failed: loan state not restored");
        }
    }

    async fn undo_member_update(&self, member_before: Member) {
        let member_id = member_before.id;
        if let Err(err) = self.members.update(member_before).await {
            tracing::error!(%member_id, error = %err, "compensation failed: member state not restored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::member::MemberKind;
    use crate::repository::{
        document::MockDocumentRepository, loan::MockLoanRepository, member::MockMemberRepository,
        review::MockReviewRepository,
    };

    fn service(
        documents: MockDocumentRepository,
        members: MockMemberRepository,
        loans: MockLoanRepository,
    ) -> CirculationService {
        CirculationService::new(
            Arc::new(documents),
            Arc::new(members),
            Arc::new(loans),
            Arc::new(MockReviewRepository::new()),
            CirculationPolicy::default(),
        )
    }

    fn sample_member(active: bool, borrowed: usize) -> Member {
        let mut member = Member::new(
            MemberId::new(),
            "Grace".into(),
            "grace@example.com".into(),
            MemberKind::Student,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            5,
        );
        member.active = active;
        for _ in 0..borrowed {
            member.borrow_document(DocumentId::new()).unwrap();
        }
        member
    }

    fn sample_document(total: u32, borrowed: u32) -> Document {
        let mut document = Document::new(
            DocumentId::new(),
            "SICP".into(),
            "Abelson & Sussman".into(),
            "Computer Science".into(),
            1985,
            None,
            None,
            String::new(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            total,
        );
        for _ in 0..borrowed {
            document.borrow_one().unwrap();
        }
        document
    }

    #[tokio::test]
    async fn borrow_fails_for_unknown_member_before_touching_documents() {
        let mut members = MockMemberRepository::new();
        members.expect_find_by_id().returning(|_| Ok(None));
        // No expectations on the other stores: the first failing precondition
        // must short-circuit.
        let svc = service(
            MockDocumentRepository::new(),
            members,
            MockLoanRepository::new(),
        );
        let err = svc.borrow(MemberId::new(), DocumentId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound { entity: "member", .. }));
    }

    #[tokio::test]
    async fn borrow_fails_for_inactive_member() {
        let member = sample_member(false, 0);
        let member_id = member.id;
        let mut members = MockMemberRepository::new();
        members
            .expect_find_by_id()
            .returning(move |_| Ok(Some(member.clone())));
        let svc = service(
            MockDocumentRepository::new(),
            members,
            MockLoanRepository::new(),
        );
        let err = svc.borrow(member_id, DocumentId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::InactiveMember { .. }));
    }

    #[tokio::test]
    async fn borrow_fails_at_the_limit_before_the_document_is_read() {
        let member = sample_member(true, 5);
        let member_id = member.id;
        let mut members = MockMemberRepository::new();
        members
            .expect_find_by_id()
            .returning(move |_| Ok(Some(member.clone())));
        let svc = service(
            MockDocumentRepository::new(),
            members,
            MockLoanRepository::new(),
        );
        let err = svc.borrow(member_id, DocumentId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::LimitExceeded(_)));
    }

    #[tokio::test]
    async fn borrow_fails_when_no_copy_is_available() {
        let member = sample_member(true, 0);
        let member_id = member.id;
        let document = sample_document(1, 1);
        let document_id = document.id;

        let mut members = MockMemberRepository::new();
        members
            .expect_find_by_id()
            .returning(move |_| Ok(Some(member.clone())));
        let mut documents = MockDocumentRepository::new();
        documents
            .expect_find_by_id()
            .returning(move |_| Ok(Some(document.clone())));

        let svc = service(documents, members, MockLoanRepository::new());
        let err = svc.borrow(member_id, document_id).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn failed_quantity_write_rolls_back_member_and_loan() {
        let member = sample_member(true, 0);
        let member_id = member.id;
        let document = sample_document(1, 0);
        let document_id = document.id;

        let mut members = MockMemberRepository::new();
        members
            .expect_find_by_id()
            .returning(move |_| Ok(Some(member.clone())));
        // Second update is the compensation restoring the pre-borrow member.
        let mut update_calls = 0u32;
        members.expect_update().times(2).returning(move |m| {
            update_calls += 1;
            if update_calls == 2 {
                assert_eq!(m.borrowed_count(), 0);
            }
            Ok(())
        });

        let mut documents = MockDocumentRepository::new();
        documents
            .expect_find_by_id()
            .returning(move |_| Ok(Some(document.clone())));
        documents
            .expect_update_quantity()
            .times(1)
            .returning(|_, _| Err(AppError::storage(std::io::Error::other("disk gone"))));

        let mut loans = MockLoanRepository::new();
        loans.expect_create().times(1).returning(|_| Ok(()));
        loans.expect_delete().times(1).returning(|_| Ok(()));

        let svc = service(documents, members, loans);
        let err = svc.borrow(member_id, document_id).await.unwrap_err();
        assert!(matches!(err, AppError::StorageError(_)));
    }

    #[tokio::test]
    async fn renew_persists_the_extended_due_date() {
        let today = Utc::now().date_naive();
        let loan = LoanTransaction::new(
            LoanId::new(),
            MemberId::new(),
            DocumentId::new(),
            today,
            today + Duration::days(14),
        );
        let loan_id = loan.id;

        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_by_id()
            .returning(move |_| Ok(Some(loan.clone())));
        loans
            .expect_update()
            .times(1)
            .withf(move |l| l.renewal_count() == 1 && l.status() == LoanStatus::Renewed)
            .returning(|_| Ok(()));

        let svc = service(
            MockDocumentRepository::new(),
            MockMemberRepository::new(),
            loans,
        );
        let due = svc.renew(loan_id).await.unwrap();
        assert_eq!(due, today + Duration::days(21));
    }

    #[tokio::test]
    async fn renew_at_the_limit_writes_nothing() {
        let today = Utc::now().date_naive();
        let mut loan = LoanTransaction::new(
            LoanId::new(),
            MemberId::new(),
            DocumentId::new(),
            today,
            today + Duration::days(14),
        );
        loan.renew(7, 2).unwrap();
        loan.renew(7, 2).unwrap();
        let loan_id = loan.id;

        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_by_id()
            .returning(move |_| Ok(Some(loan.clone())));
        // No expect_update: a write would fail the test.

        let svc = service(
            MockDocumentRepository::new(),
            MockMemberRepository::new(),
            loans,
        );
        let err = svc.renew(loan_id).await.unwrap_err();
        assert!(matches!(err, AppError::LimitExceeded(_)));
    }

    #[tokio::test]
    async fn renew_refuses_a_loan_closed_between_read_and_lock() {
        // The first read sees an open loan; by the time the document lock is
        // held a return has closed it. Renew must see the closed state on the
        // re-read and write nothing back.
        let today = Utc::now().date_naive();
        let open_loan = LoanTransaction::new(
            LoanId::new(),
            MemberId::new(),
            DocumentId::new(),
            today,
            today + Duration::days(14),
        );
        let loan_id = open_loan.id;
        let mut closed_loan = open_loan.clone();
        closed_loan.close(today, 0.50).unwrap();

        let mut loans = MockLoanRepository::new();
        let mut reads = 0u32;
        loans.expect_find_by_id().times(2).returning(move |_| {
            reads += 1;
            if reads == 1 {
                Ok(Some(open_loan.clone()))
            } else {
                Ok(Some(closed_loan.clone()))
            }
        });
        // No expect_update: resurrecting the loan would fail the test.

        let svc = service(
            MockDocumentRepository::new(),
            MockMemberRepository::new(),
            loans,
        );
        let err = svc.renew(loan_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn lock_tables_do_not_accumulate_entries_for_bogus_ids() {
        let mut members = MockMemberRepository::new();
        members.expect_find_by_id().returning(|_| Ok(None));
        let svc = service(
            MockDocumentRepository::new(),
            members,
            MockLoanRepository::new(),
        );
        for _ in 0..64 {
            let err = svc.borrow(MemberId::new(), DocumentId::new()).await.unwrap_err();
            assert!(matches!(err, AppError::EntityNotFound { .. }));
        }
        // Each acquisition prunes entries nobody holds, so only the most
        // recent key can still be resident.
        assert!(svc.member_locks.len() <= 1);
        assert!(svc.document_locks.len() <= 1);
    }

    #[tokio::test]
    async fn member_removal_disagreement_is_a_consistency_violation() {
        // Loan store says one open loan, borrowed set says none.
        let member = sample_member(true, 0);
        let member_id = member.id;
        let mut members = MockMemberRepository::new();
        members
            .expect_find_by_id()
            .returning(move |_| Ok(Some(member.clone())));

        let today = Utc::now().date_naive();
        let open_loan = LoanTransaction::new(
            LoanId::new(),
            member_id,
            DocumentId::new(),
            today,
            today + Duration::days(14),
        );
        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_open_by_member()
            .returning(move |_| Ok(vec![open_loan.clone()]));

        let svc = service(MockDocumentRepository::new(), members, loans);
        let err = svc.remove_member(member_id).await.unwrap_err();
        assert!(matches!(err, AppError::ConsistencyViolation(_)));
    }

    #[tokio::test]
    async fn document_removal_is_blocked_by_open_loans() {
        let document = sample_document(2, 1);
        let document_id = document.id;
        let mut documents = MockDocumentRepository::new();
        documents
            .expect_find_by_id()
            .returning(move |_| Ok(Some(document.clone())));

        let today = Utc::now().date_naive();
        let open_loan = LoanTransaction::new(
            LoanId::new(),
            MemberId::new(),
            document_id,
            today,
            today + Duration::days(14),
        );
        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_open_by_document()
            .returning(move |_| Ok(vec![open_loan.clone()]));

        let svc = service(documents, MockMemberRepository::new(), loans);
        let err = svc.remove_document(document_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
