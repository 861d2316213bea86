//! Model predictive path integral (MPPI) controller

pub mod config;
pub mod control_sequence;
pub mod controller;
pub mod critic_data;
pub mod critics;
pub mod filter;
pub mod motion_model;
pub mod noise;
pub mod optimizer;
pub mod path;
pub mod path_handler;
pub mod trajectories;

pub use config::MppiConfig;
pub use controller::{CycleOutput, Diagnostics, MppiController};
pub use optimizer::{CancelToken, CycleStatus};
