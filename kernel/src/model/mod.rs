pub mod document;
pub mod id;
pub mod loan;
pub mod member;
pub mod review;
