//! rust_mppi - sampling based model predictive path tracking
//!
//! Every control cycle the controller perturbs its nominal control
//! sequence, rolls the samples out with the robot's kinematic model,
//! scores them with a pipeline of critics and turns the scores into a new
//! sequence by importance weighting. The first command of the smoothed
//! sequence is handed out, the rest warm-starts the next cycle.

// Core modules
pub mod common;
pub mod utils;

// Controller
pub mod mppi;

// Re-export common types for convenience
pub use common::{Control, Path2D, Point2D, Pose2D, PoseStamped};
pub use common::{CostLookup, MotionModel, PathTracker};
pub use common::{MppiError, MppiResult};
pub use mppi::{CancelToken, CycleOutput, CycleStatus, Diagnostics, MppiConfig, MppiController};
