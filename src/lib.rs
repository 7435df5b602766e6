//! ghspider crate
//!
//! Library behind the `ghspider` tool, which maps the social graph around a GitHub
//! account and exports it as a GEXF document. The [`spider`] module holds the crawler;
//! the other modules provide the command line, configuration and reports around it.

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[doc(hidden)]
pub mod commands;

#[doc(hidden)]
pub mod config;

#[doc(hidden)]
pub mod reports;

pub mod spider;

pub use crate::commands::{Host, run};
