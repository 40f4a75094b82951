//! Align Core - onset-based track alignment
//!
//! This crate contains the alignment logic with no host dependencies:
//! onset detection on WAV sources, onset matching and grouping, and
//! split/move/gap-fill edit planning against an injected timeline host.
//! It can be driven by the CLI or embedded in another host.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod edit;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod timeline;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
