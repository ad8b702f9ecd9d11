pub mod expand;
pub mod normalize;

pub use expand::expand;
pub use normalize::{QuerySource, SearchQuery, extract_from_filename, normalize, variations};
