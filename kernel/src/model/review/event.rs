use super::super::id::{DocumentId, MemberId, ReviewId};

#[derive(Debug, Clone)]
pub struct CreateReview {
    pub member_id: MemberId,
    pub document_id: DocumentId,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct UpdateReview {
    pub review_id: ReviewId,
    pub rating: u8,
    pub comment: String,
}
