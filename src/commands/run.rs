//! Command dispatch logic for ghspider

use super::{InitArgs, SpiderArgs, init_config, spider_command};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "ghspider", version, author)]
#[command(about = "Map the social graph around a GitHub account")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the accounts around a seed account and write the graph as GEXF
    Spider(Box<SpiderArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Errors
///
/// Returns an error if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        Command::Spider(spider_args) => spider_command(host, spider_args).await,
        Command::Init(init_args) => init_config(host, init_args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_spider() {
        let cli = Cli::parse_from(["ghspider", "spider", "alice", "--depth", "2", "--json", "out.json"]);
        let Command::Spider(args) = cli.command else {
            unreachable!("expected the spider command");
        };
        assert_eq!(args.login, "alice");
        assert_eq!(args.depth, Some(2));
        assert_eq!(args.json.as_deref().map(camino::Utf8Path::as_str), Some("out.json"));
        assert_eq!(args.output, None);
    }

    #[test]
    fn test_parse_init_default_path() {
        let cli = Cli::parse_from(["ghspider", "init"]);
        let Command::Init(args) = cli.command else {
            unreachable!("expected the init command");
        };
        assert_eq!(args.output, "ghspider.toml");
    }
}
