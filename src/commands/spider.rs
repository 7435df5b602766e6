use super::common::{ColorMode, LogLevel, init_logging};
use super::{Host, ProgressReporter};
use crate::Result;
use crate::config::Config;
use crate::reports::{generate_console, generate_csv, generate_json};
use crate::spider::{
    ClientPool, CrawlSettings, GITHUB_RATE_LIMIT_AUTHENTICATED, GITHUB_RATE_LIMIT_UNAUTHENTICATED, GitHubClient, ManagedClient, Pacer,
    Progress, RelationFetcher, Spider, gexf,
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use ohno::{IntoAppError, app_err, bail};
use std::fs;
use std::io::Write;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "  ghspider";

/// Exit code reported when the crawl was interrupted with Ctrl-C
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
pub struct SpiderArgs {
    /// GitHub login of the account to start from
    #[arg(value_name = "LOGIN")]
    pub login: String,

    /// Number of levels to expand around the seed (1 to 5)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub depth: Option<i64>,

    /// Stop admitting accounts once the graph holds this many
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub max_nodes: Option<i64>,

    /// Skip accounts with fewer followers than this
    #[arg(long, value_name = "N")]
    pub min_followers: Option<u64>,

    /// Skip accounts with fewer public repositories than this
    #[arg(long, value_name = "N")]
    pub min_repos: Option<u64>,

    /// Maximum number of accounts processed at once
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// GitHub personal access token; repeat or separate with commas to spread the load over several tokens
    #[arg(long = "token", value_name = "TOKEN", env = "GITHUB_TOKEN", value_delimiter = ',', hide_env_values = true)]
    pub tokens: Vec<String>,

    /// Path to configuration file (default is `ghspider.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,

    /// Write the graph as GEXF to this file (default is `<LOGIN>_graph.gexf`)
    #[arg(long, short = 'o', value_name = "PATH", help_heading = "Report Output")]
    pub output: Option<Utf8PathBuf>,

    /// Also write the graph as JSON to this file
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub json: Option<Utf8PathBuf>,

    /// Also write the edge list as CSV to this file
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub csv: Option<Utf8PathBuf>,
}

impl SpiderArgs {
    /// Settings from the configuration, with the values given on the command line taking precedence.
    fn crawl_settings(&self, config: &Config) -> CrawlSettings {
        let settings = config.crawl_settings();
        CrawlSettings {
            depth: self.depth.unwrap_or(settings.depth),
            max_nodes: self.max_nodes.unwrap_or(settings.max_nodes),
            min_followers: self.min_followers.unwrap_or(settings.min_followers),
            min_repos: self.min_repos.unwrap_or(settings.min_repos),
            workers: self.workers.unwrap_or(settings.workers),
            repos_per_account: settings.repos_per_account,
        }
    }
}

/// Crawl the graph around a seed account and write the requested artifacts.
pub async fn spider_command<H: Host>(host: &mut H, args: &SpiderArgs) -> Result<()> {
    init_logging(args.log_level);

    let login = args.login.trim();
    if !is_valid_login(login) {
        bail!("'{login}' is not a valid GitHub login");
    }

    let base_dir = Utf8PathBuf::from_path_buf(std::env::current_dir().into_app_err("determining the current directory")?)
        .map_err(|path| app_err!("current directory {} is not valid UTF-8", path.display()))?;
    let (config, config_path, warnings) = Config::load(&base_dir, args.config.as_deref())?;
    match &config_path {
        Some(path) => log::info!(target: LOG_TARGET, "Using configuration from {path}"),
        None => log::info!(target: LOG_TARGET, "Using the default configuration"),
    }
    for warning in &warnings {
        let _ = writeln!(host.error(), "warning: {warning}");
    }

    let settings = args.crawl_settings(&config);
    log::info!(target: LOG_TARGET, "Crawl settings: {settings:?}");

    let pool = ClientPool::new(build_clients(&args.tokens, &config.api_url)?, config.low_quota_threshold)?;
    pool.prime().await;

    let cancel = CancellationToken::new();
    let fetcher = RelationFetcher::new(pool, Pacer::new(config.pacing_interval()), cancel.clone());
    let spider = Spider::new(fetcher, settings);

    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() {
                        log::warn!(target: LOG_TARGET, "Interrupted, finishing with the accounts gathered so far");
                        cancel.cancel();
                    }
                }
            }
        }
    });

    let progress = ProgressReporter::new(args.log_level.progress_delay(), args.color.for_stderr());
    let report = spider.run(login, Some(&progress)).await;
    interrupt.abort();
    progress.done();
    let report = report?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(format!("{}_graph.gexf", report.seed)));
    let use_colors = args.color.for_stdout();

    let summary = spider.export(|view| {
        let mut document = String::new();
        gexf::write(view, &report.seed, &mut document)?;
        write_artifact(&output, &document)?;

        if let Some(path) = &args.json {
            let mut json = String::new();
            generate_json(view, &report.seed, &mut json)?;
            write_artifact(path, &json)?;
        }

        if let Some(path) = &args.csv {
            let mut csv = String::new();
            generate_csv(view, &mut csv)?;
            write_artifact(path, &csv)?;
        }

        let mut summary = String::new();
        generate_console(view, &report, use_colors, &mut summary)?;
        Ok(summary)
    })?;

    let _ = write!(host.output(), "{summary}");
    let _ = writeln!(host.output(), "\nGraph written to {output}");

    if report.cancelled {
        host.exit(INTERRUPTED_EXIT_CODE);
    }

    Ok(())
}

fn write_artifact(path: &Utf8Path, contents: &str) -> Result<()> {
    fs::write(path, contents).into_app_err_with(|| format!("writing {path}"))?;
    log::info!(target: LOG_TARGET, "Wrote {path}");
    Ok(())
}

/// One client per token, or a single anonymous client when there is none.
fn build_clients(tokens: &[String], api_url: &str) -> Result<Vec<ManagedClient<GitHubClient>>> {
    let tokens: Vec<&str> = tokens.iter().map(|token| token.trim()).filter(|token| !token.is_empty()).collect();

    // real values arrive when the pool is primed
    let reset_at = Utc::now() + ChronoDuration::hours(1);

    if tokens.is_empty() {
        log::warn!(
            target: LOG_TARGET,
            "No GitHub token given, unauthenticated clients are limited to {GITHUB_RATE_LIMIT_UNAUTHENTICATED} calls per hour"
        );
        let client = GitHubClient::new(None, api_url)?;
        return Ok(vec![ManagedClient::new(client, "anonymous", GITHUB_RATE_LIMIT_UNAUTHENTICATED, reset_at)]);
    }

    tokens
        .into_iter()
        .map(|token| {
            let client = GitHubClient::new(Some(token), api_url)?;
            Ok(ManagedClient::new(client, mask_token(token), GITHUB_RATE_LIMIT_AUTHENTICATED, reset_at))
        })
        .collect()
}

/// Label a token by its last four characters so it can show up in logs.
fn mask_token(token: &str) -> String {
    let start = token.char_indices().rev().nth(3).map_or(0, |(index, _)| index);
    format!("token …{}", token.get(start..).unwrap_or_default())
}

/// GitHub logins are ASCII alphanumerics and single hyphens, at most 39 characters.
fn is_valid_login(login: &str) -> bool {
    !login.is_empty()
        && login.len() <= 39
        && !login.starts_with('-')
        && !login.ends_with('-')
        && !login.contains("--")
        && login.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
