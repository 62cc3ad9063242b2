//! Core module - configuration and application state
//!
//! - [`Config`] - environment-driven settings
//! - [`AppState`] - services wired over one store

pub mod config;
pub mod state;

pub use config::Config;
pub use state::AppState;
