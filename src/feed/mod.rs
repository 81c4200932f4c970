pub mod aggregate;
pub mod merge;
pub mod normalize;
pub mod pagination;
pub mod rank;
pub mod types;
