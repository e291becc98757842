use std::sync::Arc;

use chrono::Utc;
use derive_new::new;
use shared::error::{AppError, AppResult};

use crate::model::{
    id::{DocumentId, MemberId, ReviewId},
    review::{
        event::{CreateReview, UpdateReview},
        Review,
    },
};
use crate::repository::{
    document::DocumentRepository, member::MemberRepository, review::ReviewRepository,
};

/// Member reviews of catalog documents.
#[derive(new)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    documents: Arc<dyn DocumentRepository>,
    members: Arc<dyn MemberRepository>,
}

impl ReviewService {
    pub async fn add_review(&self, event: CreateReview) -> AppResult<Review> {
        if self.members.find_by_id(event.member_id).await?.is_none() {
            return Err(AppError::not_found("member", event.member_id));
        }
        if self.documents.find_by_id(event.document_id).await?.is_none() {
            return Err(AppError::not_found("document", event.document_id));
        }
        let review = Review::new(
            ReviewId::new(),
            event.member_id,
            event.document_id,
            event.rating,
            event.comment,
            Utc::now(),
        )?;
        self.reviews.create(review.clone()).await?;
        Ok(review)
    }

    pub async fn update_review(&self, event: UpdateReview) -> AppResult<()> {
        let mut review = self
            .reviews
            .find_by_id(event.review_id)
            .await?
            .ok_or_else(|| AppError::not_found("review", event.review_id))?;
        review.set_rating(event.rating)?;
        review.comment = event.comment;
        self.reviews.update(review).await
    }

    pub async fn delete_review(&self, review_id: ReviewId) -> AppResult<()> {
        if self.reviews.find_by_id(review_id).await?.is_none() {
            return Err(AppError::not_found("review", review_id));
        }
        self.reviews.delete(review_id).await
    }

    pub async fn mark_helpful(&self, review_id: ReviewId) -> AppResult<u32> {
        let mut review = self
            .reviews
            .find_by_id(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("review", review_id))?;
        review.mark_helpful();
        let votes = review.helpful_votes();
        self.reviews.update(review).await?;
        Ok(votes)
    }

    pub async fn reviews_for_document(&self, document_id: DocumentId) -> AppResult<Vec<Review>> {
        self.reviews.find_by_document(document_id).await
    }

    pub async fn reviews_by_member(&self, member_id: MemberId) -> AppResult<Vec<Review>> {
        self.reviews.find_by_member(member_id).await
    }

    /// Mean rating across all reviews of a document, `None` when unreviewed.
    pub async fn average_rating(&self, document_id: DocumentId) -> AppResult<Option<f64>> {
        let reviews = self.reviews.find_by_document(document_id).await?;
        if reviews.is_empty() {
            return Ok(None);
        }
        let sum: u32 = reviews.iter().map(|r| r.rating() as u32).sum();
        Ok(Some(sum as f64 / reviews.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        document::MockDocumentRepository, member::MockMemberRepository,
        review::MockReviewRepository,
    };

    #[tokio::test]
    async fn review_requires_an_existing_member() {
        let mut members = MockMemberRepository::new();
        members.expect_find_by_id().returning(|_| Ok(None));
        let svc = ReviewService::new(
            Arc::new(MockReviewRepository::new()),
            Arc::new(MockDocumentRepository::new()),
            Arc::new(members),
        );
        let err = svc
            .add_review(CreateReview {
                member_id: MemberId::new(),
                document_id: DocumentId::new(),
                rating: 5,
                comment: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound { entity: "member", .. }));
    }

    #[tokio::test]
    async fn average_rating_over_mixed_reviews() {
        let document_id = DocumentId::new();
        let mut reviews = MockReviewRepository::new();
        reviews.expect_find_by_document().returning(move |_| {
            Ok(vec![
                Review::new(ReviewId::new(), MemberId::new(), document_id, 5, "".into(), Utc::now())
                    .unwrap(),
                Review::new(ReviewId::new(), MemberId::new(), document_id, 2, "".into(), Utc::now())
                    .unwrap(),
            ])
        });
        let svc = ReviewService::new(
            Arc::new(reviews),
            Arc::new(MockDocumentRepository::new()),
            Arc::new(MockMemberRepository::new()),
        );
        assert_eq!(svc.average_rating(document_id).await.unwrap(), Some(3.5));
    }
}
