pub mod graph;
pub mod pipeline;
pub mod stages;

#[cfg(all(test, unix))]
mod fakes;

pub use pipeline::{Pipeline, RunSettings};
