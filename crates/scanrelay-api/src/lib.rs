//! Scanrelay API Library
//!
//! This crate provides the HTTP handlers, middleware, and application setup.

mod api_doc;
mod handlers;
mod middleware;
mod utils;

pub mod error;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
