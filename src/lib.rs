//! Capture a photo, dress it up with props, flatten it and upload it.
//!
//! The [`app::WorkflowController`] is the entry point. It is handed a
//! capture provider, a compositor, an upload client and a registration
//! client, and runs them in that order when the user uploads.

pub mod app;
pub mod capture;
pub mod editor;
pub mod error;
pub mod register;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use error::{Result, WorkflowError};
