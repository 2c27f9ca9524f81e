//! CLI commands

pub mod job;
