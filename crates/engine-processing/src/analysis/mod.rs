pub mod analyzer;
pub mod profile;
pub mod score;
pub mod transforms;
