//! mockie installer library.
//!
//! Builds the mockie CLI in release mode, copies the executable into a
//! platform-appropriate directory and adds that directory to the user's
//! persistent PATH. The `mockie-installer` binary wires these pieces
//! together; the library is usable on its own for tests or custom flows.
//!
//! # Modules
//!
//! - [`builder`] - Release build through cargo
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - External command execution
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Error types and fatal/advisory classification
//! - [`install`] - Copying the executable, with fallback and elevation
//! - [`output`] - Status text for the CLI
//! - [`pipeline`] - Install workflow orchestration
//! - [`platform`] - Host platform detection and per-platform conventions
//! - [`registrar`] - Persistent PATH registration
//! - [`resolution`] - Install directory candidates
//! - [`verify`] - Post-install verification

pub mod builder;
pub mod cli;
pub mod command;
pub mod dirs;
pub mod error;
pub mod install;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod registrar;
pub mod resolution;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod verify;
