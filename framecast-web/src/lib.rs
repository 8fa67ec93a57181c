//! Framecast Web - JSON API server
//!
//! Exposes the render pipeline over HTTP: job submission and polling,
//! bulk generation, and artifact status lookups.

pub mod handlers;
pub mod server;

pub use server::{AppState, router, run_server};
