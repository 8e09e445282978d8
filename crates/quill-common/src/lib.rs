//! Shared utilities for Quill binaries and services.

pub mod logging;

pub use logging::init_logging;
