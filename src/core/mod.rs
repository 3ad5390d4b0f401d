//! Core domain models for deployments
//!
//! This module defines the configuration, the step list built from it,
//! and the state a run produces.

pub mod config;
pub mod pipeline;
pub mod step;
pub mod state;

pub use config::DeployConfig;
pub use pipeline::*;
pub use step::*;
pub use state::*;
