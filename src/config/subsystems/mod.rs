pub mod detection;
pub mod analysis;

pub use detection::DetectionConfig;
pub use analysis::AnalysisConfig;
