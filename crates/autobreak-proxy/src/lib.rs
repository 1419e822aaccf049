//! autobreak-proxy: System proxy switching
//!
//! This crate points the host's system proxy at the chosen node:
//! - Proxy applier trait with an idempotent apply
//! - Command-driven applier for OS proxy tools
//! - Proxy target rendering from the configured template

pub mod command;
pub mod switch;
pub mod traits;

pub use command::CommandProxy;
pub use switch::{render_target, ProxySwitch};
pub use traits::ProxyApplier;
