use chrono::NaiveDate;
use shared::error::{AppError, AppResult};

use super::id::DocumentId;

pub mod event;

/// Availability derived from the copy counters, never stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Available,
    Borrowed,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: i32,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub description: String,
    pub added_on: NaiveDate,
    total_quantity: u32,
    available_quantity: u32,
}

impl Document {
    /// Invariant: `available_quantity <= total_quantity` at all times. The
    /// counters are private so every mutation goes through the methods below.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DocumentId,
        title: String,
        author: String,
        genre: String,
        year: i32,
        isbn: Option<String>,
        publisher: Option<String>,
        description: String,
        added_on: NaiveDate,
        total_quantity: u32,
    ) -> Self {
        Self {
            id,
            title,
            author,
            genre,
            year,
            isbn,
            publisher,
            description,
            added_on,
            total_quantity,
            available_quantity: total_quantity,
        }
    }

    pub fn total_quantity(&self) -> u32 {
        self.total_quantity
    }

    pub fn available_quantity(&self) -> u32 {
        self.available_quantity
    }

    pub fn borrowed_quantity(&self) -> u32 {
        self.total_quantity - self.available_quantity
    }

    pub fn is_available(&self) -> bool {
        self.available_quantity > 0
    }

    pub fn status(&self) -> DocumentStatus {
        if self.is_available() {
            DocumentStatus::Available
        } else {
            DocumentStatus::Borrowed
        }
    }

    /// Takes one copy off the shelf.
    pub fn borrow_one(&mut self) -> AppResult<()> {
        if self.available_quantity == 0 {
            return Err(AppError::Unavailable {
                document_id: self.id.to_string(),
            });
        }
        self.available_quantity -= 1;
        Ok(())
    }

    /// Puts one copy back, capped at the total so a stray double-return can
    /// never push the counter past the owned stock.
    pub fn return_one(&mut self) {
        if self.available_quantity < self.total_quantity {
            self.available_quantity += 1;
        }
    }

    /// Restock: new copies arrive both owned and available.
    pub fn add_quantity(&mut self, quantity: u32) {
        self.total_quantity += quantity;
        self.available_quantity += quantity;
    }

    /// Total may only shrink down to the number of copies currently out on
    /// loan; anything lower would leave borrowed copies unaccounted for.
    pub fn set_total_quantity(&mut self, total: u32) -> AppResult<()> {
        let borrowed = self.borrowed_quantity();
        if total < borrowed {
            return Err(AppError::InvalidState(format!(
                "cannot reduce total below {borrowed} copies currently on loan"
            )));
        }
        self.total_quantity = total;
        self.available_quantity = total - borrowed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(total: u32) -> Document {
        Document::new(
            DocumentId::new(),
            "The Rust Programming Language".into(),
            "Klabnik & Nichols".into(),
            "Programming".into(),
            2019,
            None,
            None,
            String::new(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            total,
        )
    }

    #[test]
    fn borrow_and_return_move_the_counter() {
        let mut d = doc(2);
        d.borrow_one().unwrap();
        assert_eq!(d.available_quantity(), 1);
        assert_eq!(d.borrowed_quantity(), 1);
        d.return_one();
        assert_eq!(d.available_quantity(), 2);
    }

    #[test]
    fn borrow_fails_when_no_copies_left() {
        let mut d = doc(1);
        d.borrow_one().unwrap();
        assert_eq!(d.status(), DocumentStatus::Borrowed);
        assert!(matches!(d.borrow_one(), Err(AppError::Unavailable { .. })));
        assert_eq!(d.available_quantity(), 0);
    }

    #[test]
    fn return_is_capped_at_total() {
        let mut d = doc(1);
        d.return_one();
        assert_eq!(d.available_quantity(), 1);
    }

    #[test]
    fn total_cannot_drop_below_borrowed_copies() {
        let mut d = doc(3);
        d.borrow_one().unwrap();
        d.borrow_one().unwrap();
        assert!(d.set_total_quantity(1).is_err());
        assert_eq!(d.total_quantity(), 3);
        d.set_total_quantity(2).unwrap();
        assert_eq!(d.available_quantity(), 0);
    }
}
