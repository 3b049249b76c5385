//! Logging and trace export setup shared by Pipewright binaries.

pub mod tracing_setup;

pub use tracing_setup::{TracingOptions, directive_for_verbosity, init_tracing, shutdown_tracing};
