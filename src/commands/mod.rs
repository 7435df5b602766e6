//! Command-line interface for ghspider
//!
//! # Implementation Model
//!
//! - **spider**: loads the configuration, builds one GitHub client per token, runs the
//!   crawl with a Ctrl-C handler and a progress spinner, then writes the GEXF document,
//!   the optional JSON/CSV exports and a console summary
//! - **init**: writes the default configuration file
//!
//! All output goes through a [`Host`] so the commands can be driven from tests.

mod common;
mod host;
mod init;
mod progress_reporter;
mod run;
mod spider;

pub use common::{ColorMode, LogLevel};
pub use host::Host;
#[cfg(test)]
pub use host::TestHost;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use run::run;
pub use spider::{SpiderArgs, spider_command};
