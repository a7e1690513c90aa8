pub mod candidate;
pub mod chunk;
pub mod events;
pub mod matching;
pub mod progress;
pub mod records;
pub mod result;
