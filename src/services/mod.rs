//! Services: the repository facade.

pub mod repository;

pub use repository::Repository;
