pub mod analyzer;

pub use self::analyzer::{
    build_label_matrix, entity_universe, group_trajectories, TrajectoryAnalyzer,
};
