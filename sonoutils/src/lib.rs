//! Small shared helpers for the Sonorium workspace.
//!
//! - [`guess_local_ip`] : guesses the local IP network speakers should use to
//!   reach the stream endpoint
//! - [`sanitize`] : derives stable URL-safe identifiers from display names

mod ip_utils;
mod sanitize;

pub use ip_utils::guess_local_ip;
pub use sanitize::sanitize;
