pub mod builder;
pub mod direction;
pub mod normalize;
