pub mod circulation;
pub mod review;
