//! autobreak-core: Core types for the autobreak node selector
//!
//! This crate provides the fundamental types used throughout autobreak:
//! - Node, sample and latency map definitions
//! - Configuration types and validation
//! - Sample aggregation statistics
//! - Error handling

pub mod config;
pub mod error;
pub mod model;
pub mod stats;

pub use config::*;
pub use error::*;
pub use model::*;
pub use stats::*;
