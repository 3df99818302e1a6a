mod complexity;
mod coverage;
mod judge;
mod quality;
mod similarity;

pub use complexity::ComplexityStrategy;
pub use coverage::CoverageStrategy;
pub use judge::JudgeStrategy;
pub use quality::QualityStrategy;
pub use similarity::SimilarityStrategy;
