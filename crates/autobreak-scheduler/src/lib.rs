//! autobreak-scheduler: Periodic node selection
//!
//! This crate drives the selection loop:
//! - One evaluate, select, apply pass per cycle
//! - Last-known latency per node
//! - Fixed-period scheduling with a single cycle in flight

pub mod driver;
pub mod pipeline;

pub use driver::{Driver, DriverStats};
pub use pipeline::Pipeline;
