// server/src/lib.rs

//! HTTP server, configuration and background jobs for the storefront.

pub mod config;
pub mod errors;
pub mod jobs;
pub mod state;
pub mod web;
