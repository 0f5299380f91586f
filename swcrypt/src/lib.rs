//! swcrypt command-line library
//!
//! Command surface and output formatting for the `swcrypt` binary.

pub mod cli;
pub mod commands;
pub mod utils;
