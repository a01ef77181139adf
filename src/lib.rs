//! Loglens is a terminal client for a streaming log-analysis service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the event model, the blocking HTTP event source, the
//!   sync-to-async stream bridge, and configuration.
//! - [`cli`] parses command-line arguments and runs the one-shot analyze
//!   command that renders the streamed phases.
//! - [`api`] defines the request and record payloads shared with the
//!   service.
//! - [`logging`] appends an optional transcript of the streamed phases.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod utils;
