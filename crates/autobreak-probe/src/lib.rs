//! autobreak-probe: Latency probing and node selection
//!
//! This crate provides the measuring half of a cycle:
//! - Probers (system ping, HTTP)
//! - Per-node sampling with failure penalties
//! - Concurrent evaluation across all nodes
//! - Minimum-latency selection

pub mod evaluator;
pub mod http;
pub mod ping;
pub mod sampler;
pub mod selector;
pub mod traits;

pub use evaluator::NodeEvaluator;
pub use http::HttpProber;
pub use ping::PingProber;
pub use sampler::Sampler;
pub use selector::select;
pub use traits::{build_prober, Prober};
