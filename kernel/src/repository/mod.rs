pub mod document;
pub mod loan;
pub mod member;
pub mod review;
