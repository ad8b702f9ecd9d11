pub mod engine;

pub use engine::{SearchError, SearchMethod, SearchOptions, SearchOutcome, find_candidates};
