//! Utility modules for rust_mppi

pub mod costmap;
pub mod geometry;
pub mod visualization;

pub use costmap::{costs, CostmapSnapshot};
pub use visualization::{colors, PathStyle, PointStyle, Visualizer};
