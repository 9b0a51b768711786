//! Utilities for schema_uml

pub mod logging;

pub use logging::init_logging;
