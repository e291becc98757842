use std::collections::HashSet;

use chrono::NaiveDate;
use shared::error::{AppError, AppResult};

use super::id::{DocumentId, MemberId};

pub mod event;

/// Member classes with their default borrow limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Student,
    Faculty,
    Staff,
    Guest,
}

impl MemberKind {
    pub fn default_borrow_limit(&self) -> u32 {
        match self {
            MemberKind::Student => 5,
            MemberKind::Faculty => 10,
            MemberKind::Staff => 7,
            MemberKind::Guest => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub kind: MemberKind,
    pub registered_on: NaiveDate,
    pub active: bool,
    pub max_borrow_limit: u32,
    borrowed: HashSet<DocumentId>,
}

impl Member {
    pub fn new(
        id: MemberId,
        name: String,
        email: String,
        kind: MemberKind,
        registered_on: NaiveDate,
        max_borrow_limit: u32,
    ) -> Self {
        Self {
            id,
            name,
            email,
            kind,
            registered_on,
            active: true,
            max_borrow_limit,
            borrowed: HashSet::new(),
        }
    }

    pub fn borrowed_count(&self) -> u32 {
        self.borrowed.len() as u32
    }

    pub fn has_borrowed(&self, document_id: DocumentId) -> bool {
        self.borrowed.contains(&document_id)
    }

    /// Owned snapshot; the live set never leaves this type.
    pub fn borrowed_documents(&self) -> Vec<DocumentId> {
        self.borrowed.iter().copied().collect()
    }

    pub fn can_borrow_more(&self) -> bool {
        self.active && self.borrowed_count() < self.max_borrow_limit
    }

    pub fn borrow_document(&mut self, document_id: DocumentId) -> AppResult<()> {
        if !self.active {
            return Err(AppError::InactiveMember {
                member_id: self.id.to_string(),
            });
        }
        if self.borrowed_count() >= self.max_borrow_limit {
            return Err(AppError::LimitExceeded(format!(
                "member {} has reached the borrow limit of {}",
                self.id, self.max_borrow_limit
            )));
        }
        if !self.borrowed.insert(document_id) {
            return Err(AppError::InvalidState(format!(
                "member {} already borrowed document {document_id}",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns false when the document was not in the borrowed set.
    pub fn return_document(&mut self, document_id: DocumentId) -> bool {
        self.borrowed.remove(&document_id)
    }
}
