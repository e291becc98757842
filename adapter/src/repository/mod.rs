//! In-memory repository implementations.
//!
//! Single-process stores backing the engine in tests and demos; a database
//! adapter would implement the same kernel traits.

pub mod document;
pub mod loan;
pub mod member;
pub mod review;

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
