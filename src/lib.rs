//! raidsheet library
//!
//! Downloads a raid leader's assignment spreadsheet as CSV, caches the
//! export on disk, and renders the assignments it contains as plain text.
//! The binary is a thin wrapper around [`pipeline::run`]; the modules are
//! public for use in integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod report;
