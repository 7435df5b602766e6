//! Map the social graph around a GitHub account.
//!
//! # Quick Start
//!
//! ```bash
//! export GITHUB_TOKEN=ghp_...
//! ghspider spider octocat --depth 2 --max-nodes 300
//! ```
//!
//! This crawls the accounts around `octocat` and writes `octocat_graph.gexf`, ready to
//! be opened in Gephi. Run `ghspider init` to write a configuration file with every
//! tunable and its default.

use ghspider::{Host, run};
use std::io::Write;
use std::io::{stderr, stdout};

/// Host backed by the real process.
#[derive(Debug, Clone, Default)]
struct RealHost;

impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[tokio::main]
async fn main() -> Result<(), ohno::AppError> {
    run(&mut RealHost, std::env::args()).await
}
