//! Integration test suite for bundlekeeper
//!
//! End-to-end tests that drive the public API and the compiled binary against
//! an in-process mock release feed.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **common**: shared fixtures (install directories, fake runtime, configs)
//! - **update_flow**: update checks against a live feed, fault injection
//! - **supervision**: full supervision cycles with a real child process (unix)
//! - **cli**: the `bundlekeeper` binary

mod common;

mod cli;
mod supervision;
mod update_flow;
