//! Command-line front end for jarshade.
//!
//! The `jarshade` binary parses its arguments with [`cli`], runs the selected
//! [`commands`] handler, and maps [`error::CliError`] to exit code 1.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`commands`] - Build and resolve handlers
//! - [`error`] - Errors surfaced to the user

pub mod cli;
pub mod commands;
pub mod error;
