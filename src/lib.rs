//! Restorer - buildpack layer cache restoration
//!
//! Reconciles the layer records a previous build left in the layers
//! directory against a layer cache, removes stale records, and restores
//! the data of layers the cache still holds.

pub mod api;
pub mod buildpack;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod layer;
pub mod restore;

pub use error::{RestorerError, RestorerResult};
pub use restore::{RestoreSummary, Restorer};
