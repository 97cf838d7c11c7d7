//! Tracefold library
//!
//! Call-stack reconstruction from function-level event logs and flame graph
//! aggregation. Exposes the internal modules for the CLI and for testing.

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod output;
pub mod parser;
pub mod utils;
