use chrono::NaiveDate;
use shared::error::{AppError, AppResult};

use super::id::{DocumentId, LoanId, MemberId};

/// Loan lifecycle. `Active` and `Renewed` are the open states; `Returned`
/// and `Overdue` are terminal and decided at close time against the due date
/// in force at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    Renewed,
    Returned,
    Overdue,
}

#[derive(Debug, Clone)]
pub struct LoanTransaction {
    pub id: LoanId,
    pub member_id: MemberId,
    pub document_id: DocumentId,
    pub borrowed_on: NaiveDate,
    due_on: NaiveDate,
    returned_on: Option<NaiveDate>,
    status: LoanStatus,
    fine_amount: f64,
    renewal_count: u32,
}

impl LoanTransaction {
    /// Dates are passed in rather than read from the wall clock so past-dated
    /// loans can be constructed; the service supplies "today" on every call.
    pub fn new(
        id: LoanId,
        member_id: MemberId,
        document_id: DocumentId,
        borrowed_on: NaiveDate,
        due_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            member_id,
            document_id,
            borrowed_on,
            due_on,
            returned_on: None,
            status: LoanStatus::Active,
            fine_amount: 0.0,
            renewal_count: 0,
        }
    }

    pub fn due_on(&self) -> NaiveDate {
        self.due_on
    }

    pub fn returned_on(&self) -> Option<NaiveDate> {
        self.returned_on
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    /// Frozen at close time; never recomputed afterwards.
    pub fn fine_amount(&self) -> f64 {
        self.fine_amount
    }

    pub fn renewal_count(&self) -> u32 {
        self.renewal_count
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, LoanStatus::Active | LoanStatus::Renewed)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != LoanStatus::Returned && today > self.due_on
    }

    /// Whole days past due, zero while the loan is on time or returned.
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if !self.is_overdue(today) {
            return 0;
        }
        (today - self.due_on).num_days()
    }

    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.due_on - today).num_days()
    }

    pub fn calculate_fine(&self, today: NaiveDate, daily_fine_rate: f64) -> f64 {
        self.days_overdue(today) as f64 * daily_fine_rate
    }

    pub fn can_renew(&self, max_renewals: u32) -> bool {
        self.is_open() && self.renewal_count < max_renewals
    }

    /// Extends the due date. Refused on closed loans and past the renewal
    /// limit; a refusal leaves the loan untouched.
    pub fn renew(&mut self, additional_days: i64, max_renewals: u32) -> AppResult<()> {
        if !self.is_open() {
            return Err(AppError::InvalidState(format!(
                "loan {} is closed and cannot be renewed",
                self.id
            )));
        }
        if self.renewal_count >= max_renewals {
            return Err(AppError::LimitExceeded(format!(
                "loan {} has reached the renewal limit of {max_renewals}",
                self.id
            )));
        }
        self.due_on = self.due_on + chrono::Duration::days(additional_days);
        self.renewal_count += 1;
        self.status = LoanStatus::Renewed;
        Ok(())
    }

    /// Terminal transition: records the return date and freezes the fine.
    /// Overdue is judged against the current due date, so renewals that
    /// pushed the due date out are honored.
    pub fn close(&mut self, today: NaiveDate, daily_fine_rate: f64) -> AppResult<()> {
        if !self.is_open() {
            return Err(AppError::InvalidState(format!(
                "loan {} was already returned",
                self.id
            )));
        }
        self.returned_on = Some(today);
        if today > self.due_on {
            self.fine_amount = self.calculate_fine(today, daily_fine_rate);
            self.status = LoanStatus::Overdue;
        } else {
            self.status = LoanStatus::Returned;
        }
        Ok(())
    }

    /// Days the loan has been (or was) out.
    pub fn loan_duration(&self, today: NaiveDate) -> i64 {
        let end = self.returned_on.unwrap_or(today);
        (end - self.borrowed_on).num_days()
    }
}
