//! # Display Module
//!
//! Panel geometry, session defaults and orientation.
//!
//! ## Modules
//!
//! - [`config`]: Display specifications and defaults
//! - [`orientation`]: User-facing orientation and its device mapping

pub mod config;
pub mod orientation;

pub use config::DisplayConfig;
pub use orientation::Orientation;
