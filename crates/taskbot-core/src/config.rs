//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `taskbot.toml` configuration file
//! 3. Default values
//!
//! `${VAR_NAME}` references inside string values of the configuration file
//! are expanded from the environment after parsing.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "taskbot.toml";

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub token: String,

    /// Bot API root, without the `/bot<token>` suffix
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Chats allowed to use the bot
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,

    /// Public base URL; when set the webhook is registered at startup
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Delete the previous bot reply before answering a regular message
    #[serde(default)]
    pub replace_last_message: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_telegram_api_base(),
            allowed_chat_ids: Vec::new(),
            webhook_url: None,
            replace_last_message: false,
        }
    }
}

/// Todoist settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoistConfig {
    /// Personal API token
    pub api_key: String,

    /// REST API root
    #[serde(default = "default_todoist_base_url")]
    pub base_url: String,
}

impl Default for TodoistConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_todoist_base_url(),
        }
    }
}

/// Webhook HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_todoist_base_url() -> String {
    "https://api.todoist.com/rest/v2".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Main configuration for taskbot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub todoist: TodoistConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Raw TOML layout; every field optional so env vars can fill the gaps
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    telegram: Option<TomlTelegram>,
    todoist: Option<TomlTodoist>,
    server: Option<TomlServer>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlTelegram {
    token: Option<String>,
    api_base: Option<String>,
    allowed_chat_ids: Option<Vec<i64>>,
    webhook_url: Option<String>,
    replace_last_message: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlTodoist {
    api_key: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlServer {
    port: Option<u16>,
}

fn parse_chat_ids(value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::Config(format!("Invalid chat id in ALLOWED_CHAT_IDS: {}", s)))
        })
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    /// Expand `${VAR_NAME}` references using `lookup`.
    ///
    /// Unknown variables expand to an empty string. An unterminated `${` is
    /// kept as written.
    fn expand_env_vars<F>(value: &str, lookup: &F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut result = String::new();
        let mut rest = value;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };

            if let Some(env_value) = lookup(&after[..end]) {
                result.push_str(&env_value);
            }
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    /// Expand `${VAR}` in every string of a parsed TOML value
    fn expand_string_value<F>(value: toml::Value, lookup: &F) -> toml::Value
    where
        F: Fn(&str) -> Option<String>,
    {
        match value {
            toml::Value::String(s) => toml::Value::String(Self::expand_env_vars(&s, lookup)),
            toml::Value::Array(arr) => toml::Value::Array(
                arr.into_iter()
                    .map(|v| Self::expand_string_value(v, lookup))
                    .collect(),
            ),
            toml::Value::Table(table) => toml::Value::Table(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::expand_string_value(v, lookup)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        Self::from_toml_str(&toml_content, |key| std::env::var(key).ok())
    }

    /// Parse TOML content, resolving `${VAR}` references and overrides through `lookup`
    pub fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed: toml::Value = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        let raw: TomlConfig = Self::expand_string_value(parsed, &lookup)
            .try_into()
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;

        let mut cfg = Self::from_toml_config(raw);
        cfg.apply_overrides(&lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path` if given, else `taskbot.toml` if present, else the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_file(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an environment-like key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        cfg.apply_overrides(&lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_toml_config(raw: TomlConfig) -> Self {
        let telegram = raw.telegram.unwrap_or_default();
        let todoist = raw.todoist.unwrap_or_default();
        let server = raw.server.unwrap_or_default();

        Config {
            telegram: TelegramConfig {
                token: telegram.token.unwrap_or_default(),
                api_base: telegram.api_base.unwrap_or_else(default_telegram_api_base),
                allowed_chat_ids: telegram.allowed_chat_ids.unwrap_or_default(),
                webhook_url: telegram.webhook_url.filter(|u| !u.is_empty()),
                replace_last_message: telegram.replace_last_message.unwrap_or(false),
            },
            todoist: TodoistConfig {
                api_key: todoist.api_key.unwrap_or_default(),
                base_url: todoist.base_url.unwrap_or_else(default_todoist_base_url),
            },
            server: ServerConfig {
                port: server.port.unwrap_or_else(default_port),
            },
        }
    }

    /// Override settings with environment values
    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_TOKEN") {
            self.telegram.token = token;
        }
        if let Some(base) = get("TELEGRAM_API_BASE") {
            self.telegram.api_base = base;
        }
        if let Some(ids) = get("ALLOWED_CHAT_IDS") {
            self.telegram.allowed_chat_ids = parse_chat_ids(&ids)?;
        }
        if let Some(url) = get("WEBHOOK_URL") {
            self.telegram.webhook_url = Some(url);
        }
        if let Some(flag) = get("REPLACE_LAST_MESSAGE") {
            self.telegram.replace_last_message = parse_flag(&flag);
        }

        if let Some(key) = get("TODOIST_API") {
            self.todoist.api_key = key;
        }
        if let Some(url) = get("TODOIST_BASE_URL") {
            self.todoist.base_url = url;
        }

        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PORT: {}", port)))?;
        }

        Ok(())
    }

    /// Check that the required settings are present
    pub fn validate(&self) -> Result<()> {
        if self.telegram.token.is_empty() {
            return Err(Error::Config("TELEGRAM_TOKEN not set".to_string()));
        }
        if self.todoist.api_key.is_empty() {
            return Err(Error::Config("TODOIST_API not set".to_string()));
        }
        if self.telegram.allowed_chat_ids.is_empty() {
            return Err(Error::Config(
                "ALLOWED_CHAT_IDS is empty; at least one chat must be allowed".to_string(),
            ));
        }
        Ok(())
    }
}
