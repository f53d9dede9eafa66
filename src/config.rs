use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{self, ClientConfig, DEFAULT_BASE_URL, DEFAULT_CSRF_HEADER};
use crate::cookies::DEFAULT_CSRF_COOKIE;
use crate::page::PageOptions;

const DEFAULT_ENV_PREFIX: &str = "TWEETFEED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_true")]
    pub ajax_header: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            ajax_header: true,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("tweet-feed/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Cookie string as the browser holds it, e.g. `sessionid=..; csrftoken=..`.
    #[serde(default)]
    pub cookie: String,
    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie: String::new(),
            csrf_cookie: default_csrf_cookie(),
            csrf_header: default_csrf_header(),
        }
    }
}

fn default_csrf_cookie() -> String {
    DEFAULT_CSRF_COOKIE.to_string()
}

fn default_csrf_header() -> String {
    DEFAULT_CSRF_HEADER.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default)]
    pub sequence_responses: bool,
    #[serde(default = "default_wait_timeout", with = "humantime_serde")]
    pub wait_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            sequence_responses: false,
            wait_timeout: default_wait_timeout(),
        }
    }
}

fn default_wait_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server.base_url.clone(),
            user_agent: self.server.user_agent.clone(),
            timeout: self.server.timeout,
            csrf_cookie: self.session.csrf_cookie.clone(),
            csrf_header: self.session.csrf_header.clone(),
            ajax_header: self.server.ajax_header,
            http_client: None,
        }
    }

    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            sequence_responses: self.feed.sequence_responses,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.server.base_url.is_empty() {
        base.server.base_url = other.server.base_url;
    }
    if !other.server.user_agent.is_empty() {
        base.server.user_agent = other.server.user_agent;
    }
    if !other.server.timeout.is_zero() {
        base.server.timeout = other.server.timeout;
    }
    base.server.ajax_header = other.server.ajax_header;

    if !other.session.cookie.is_empty() {
        base.session.cookie = other.session.cookie;
    }
    if !other.session.csrf_cookie.is_empty() {
        base.session.csrf_cookie = other.session.csrf_cookie;
    }
    if !other.session.csrf_header.is_empty() {
        base.session.csrf_header = other.session.csrf_header;
    }

    base.feed.sequence_responses = other.feed.sequence_responses;
    if !other.feed.wait_timeout.is_zero() {
        base.feed.wait_timeout = other.feed.wait_timeout;
    }

    base
}

// Environment values override only the keys they name.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "server.base_url" => cfg.server.base_url = value,
        "server.user_agent" => cfg.server.user_agent = value,
        "server.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.server.timeout = duration;
            }
        }
        "server.ajax_header" => cfg.server.ajax_header = parse_flag(&value),
        "session.cookie" => cfg.session.cookie = value,
        "session.csrf_cookie" => cfg.session.csrf_cookie = value,
        "session.csrf_header" => cfg.session.csrf_header = value,
        "feed.sequence_responses" => cfg.feed.sequence_responses = parse_flag(&value),
        "feed.wait_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.wait_timeout = duration;
            }
        }
        other => log::debug!("ignoring unknown config key {other}"),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tweet-feed").join("config.yaml"))
}

/// Writes the session cookie into the config file, creating it if needed.
pub fn save_session_cookie(path: Option<PathBuf>, cookie: &str) -> Result<PathBuf> {
    let cookie = cookie.trim();
    anyhow::ensure!(!cookie.is_empty(), "config: session.cookie is required");

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };
    cfg.session.cookie = cookie.to_string();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}

pub fn client_from(cfg: &Config) -> Result<api::Client> {
    let store = crate::cookies::CookieStore::new(cfg.session.cookie.clone());
    api::Client::new(std::sync::Arc::new(store), cfg.client_config())
}
