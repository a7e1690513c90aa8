pub mod analysis;
pub mod keys;
pub mod matcher;
pub mod service;

pub use analysis::analyzer::KeyCandidateAnalyzer;
pub use keys::builder::{CanonicalKey, CanonicalKeyBuilder, KeyColumns};
pub use matcher::match_rows;
pub use service::{MatchService, http::HttpMatchService, local::LocalMatchService};
