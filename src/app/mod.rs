//! Application module
//!
//! This module contains the workflow state, the controller driving it and
//! the settings it runs with.

pub mod config;
pub mod controller;
mod state;

pub use config::{Action, Settings};
pub use controller::{Alert, Collaborators, Navigator, WorkflowController};
pub use state::{WorkflowPhase, WorkflowState};
