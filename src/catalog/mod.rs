pub mod client;
pub mod records;
pub mod types;

pub use client::{CatalogClient, CatalogError, CatalogSearch};
pub use types::Candidate;
