use crate::Result;
use crate::spider::{CrawlSettings, DEFAULT_API_URL, DEFAULT_LOW_QUOTA_THRESHOLD, MAX_DEPTH};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use directories::ProjectDirs;
use ohno::{IntoAppError, app_err, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

const CONFIG_FILE_NAMES: [&str; 4] = ["ghspider.toml", "ghspider.yml", "ghspider.yaml", "ghspider.json"];

const fn default_depth() -> i64 {
    1
}

const fn default_max_nodes() -> i64 {
    500
}

const fn default_workers() -> i64 {
    5
}

const fn default_repos_per_account() -> i64 {
    10
}

const fn default_pacing_interval_ms() -> u64 {
    100
}

const fn default_low_quota_threshold() -> usize {
    DEFAULT_LOW_QUOTA_THRESHOLD
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Tunables of a crawl, as read from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_depth")]
    pub depth: i64,

    #[serde(default = "default_max_nodes")]
    pub max_nodes: i64,

    #[serde(default)]
    pub min_followers: u64,

    #[serde(default)]
    pub min_repos: u64,

    #[serde(default = "default_workers")]
    pub workers: i64,

    #[serde(default = "default_repos_per_account")]
    pub repos_per_account: i64,

    #[serde(default = "default_pacing_interval_ms")]
    pub pacing_interval_ms: u64,

    #[serde(default = "default_low_quota_threshold")]
    pub low_quota_threshold: usize,

    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// With no explicit path, `ghspider.{toml,yml,yaml,json}` is looked up in `base_dir`
    /// and then in the user's configuration directory. Returns the configuration, the file
    /// it came from (if any), and warnings about values that will be adjusted.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds an invalid value
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8Path>) -> Result<(Self, Option<Utf8PathBuf>, Vec<String>)> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading ghspider configuration from {path}"))?;
            (path.to_path_buf(), text)
        } else {
            let mut candidates: Vec<Utf8PathBuf> = CONFIG_FILE_NAMES.iter().map(|name| base_dir.join(name)).collect();
            if let Some(dir) = user_config_dir() {
                candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)));
            }

            let mut found = None;
            for path in candidates {
                match fs::read_to_string(&path) {
                    Ok(text) => {
                        found = Some((path, text));
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_app_err_with(|| format!("reading ghspider configuration from {path}")),
                }
            }

            let Some(result) = found else {
                let config = Self::default();
                let warnings = config.validate()?;
                return Ok((config, None, warnings));
            };
            result
        };

        let config = Self::parse(&final_path, &text)?;
        let warnings = config.validate()?;
        Ok((config, Some(final_path), warnings))
    }

    fn parse(path: &Utf8Path, text: &str) -> Result<Self> {
        let extension = path.extension().unwrap_or_default();
        let config = match extension {
            "toml" => toml::from_str(text).into_app_err_with(|| format!("parsing TOML configuration from {path}"))?,
            "yml" | "yaml" => serde_yaml::from_str(text).into_app_err_with(|| format!("parsing YAML configuration from {path}"))?,
            "json" => serde_json::from_str(text).into_app_err_with(|| format!("parsing JSON configuration from {path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        Ok(config)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save(&self, output_path: &Utf8Path) -> Result<()> {
        let extension = output_path.extension().unwrap_or_default();
        let text = match extension {
            "toml" => toml::to_string_pretty(self)
                .into_app_err_with(|| format!("serializing configuration to TOML for saving to {output_path}"))?,
            "yml" | "yaml" => serde_yaml::to_string(self)
                .into_app_err_with(|| format!("serializing configuration to YAML for saving to {output_path}"))?,
            "json" => serde_json::to_string_pretty(self)
                .into_app_err_with(|| format!("serializing configuration to JSON for saving to {output_path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        fs::write(output_path, text).into_app_err_with(|| format!("writing configuration to {output_path}"))?;
        Ok(())
    }

    /// Save the default configuration, keeping its comments when writing TOML
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        if output_path.extension() == Some("toml") {
            fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
            return Ok(());
        }

        Self::default().save(output_path)
    }

    /// Check for values that cannot work, and warn about values that will be adjusted.
    fn validate(&self) -> Result<Vec<String>> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            bail!("api_url must be an http or https URL, got '{}'", self.api_url);
        }

        let mut warnings = Vec::new();

        if self.depth > i64::try_from(MAX_DEPTH).unwrap_or(i64::MAX) {
            warnings.push(format!("depth {} exceeds the maximum of {MAX_DEPTH} and will be clamped", self.depth));
        }

        for (key, value) in [
            ("depth", self.depth),
            ("max_nodes", self.max_nodes),
            ("workers", self.workers),
            ("repos_per_account", self.repos_per_account),
        ] {
            if value <= 0 {
                warnings.push(format!("{key} is {value}, the default will be used instead"));
            }
        }

        Ok(warnings)
    }

    /// Crawl parameters described by this configuration.
    #[must_use]
    pub const fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            depth: self.depth,
            max_nodes: self.max_nodes,
            min_followers: self.min_followers,
            min_repos: self.min_repos,
            workers: self.workers,
            repos_per_account: self.repos_per_account,
        }
    }

    #[must_use]
    pub const fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

fn user_config_dir() -> Option<Utf8PathBuf> {
    let dirs = ProjectDirs::from("", "", "ghspider")?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().to_path_buf()).ok()
}
