use chrono::{DateTime, Utc};
use shared::error::{AppError, AppResult};

use super::id::{DocumentId, MemberId, ReviewId};

pub mod event;

#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub member_id: MemberId,
    pub document_id: DocumentId,
    rating: u8,
    pub comment: String,
    pub reviewed_at: DateTime<Utc>,
    helpful_votes: u32,
    recommended: bool,
}

impl Review {
    pub fn new(
        id: ReviewId,
        member_id: MemberId,
        document_id: DocumentId,
        rating: u8,
        comment: String,
        reviewed_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        validate_rating(rating)?;
        Ok(Self {
            id,
            member_id,
            document_id,
            rating,
            comment,
            reviewed_at,
            helpful_votes: 0,
            recommended: rating >= 4,
        })
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn helpful_votes(&self) -> u32 {
        self.helpful_votes
    }

    /// Recommendation tracks the rating: 4 and 5 stars recommend.
    pub fn is_recommended(&self) -> bool {
        self.recommended
    }

    pub fn set_rating(&mut self, rating: u8) -> AppResult<()> {
        validate_rating(rating)?;
        self.rating = rating;
        self.recommended = rating >= 4;
        Ok(())
    }

    pub fn mark_helpful(&mut self) {
        self.helpful_votes += 1;
    }
}

fn validate_rating(rating: u8) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(format!(
            "rating must be between 1 and 5, got {rating}"
        )));
    }
    Ok(())
}
