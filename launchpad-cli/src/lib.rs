//! Launchpad CLI - operator tooling for stakeholder role resolution
//!
//! Reads configuration from flags, the environment and an optional `.env`
//! file, runs one command against the CRM and prints JSON on stdout.

pub mod commands;
pub mod config;

pub use commands::{execute, Output};
pub use config::{Args, Command, LogFormat};
