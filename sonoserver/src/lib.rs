//! # sonoserver — HTTP server infrastructure for Sonorium
//!
//! Router assembly, logging initialization and graceful lifecycle, kept
//! separate from the domain routes the binary mounts on top.

pub mod logs;
mod server;

pub use logs::init_logging;
pub use server::{Server, ServerInfo};
