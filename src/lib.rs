//! Real-time exercise repetition counting over per-frame body keypoints.

pub mod cli;
pub mod config;
pub mod counters;
pub mod device;
pub mod error;
pub mod geometry;
pub mod gestures;
pub mod keypoints;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod smoother;
