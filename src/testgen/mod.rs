pub mod candidate;
pub mod format;
pub mod select;
