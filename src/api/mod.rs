//! Rooms API server module
//!
//! HTTP JSON API over the same workspace the CLI uses.
//! Run with `rooms-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, AppState};
