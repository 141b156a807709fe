//! CLI command implementations

pub mod config;
pub mod restore;

pub use config::execute as config;
pub use restore::execute as restore;
