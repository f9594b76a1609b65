use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model behind `/llama_reply`.
    #[serde(default = "default_llama_model")]
    pub llama_model: String,
    /// Model behind `/deepseek_reply` and the Telegram relay.
    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_bot_handle")]
    pub bot_handle: String,
    /// Public origin Telegram should deliver updates to (`{domain_url}/webhook`).
    #[serde(default = "default_domain_url")]
    pub domain_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictionConfig {
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llama_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-r1-distill-llama-70b".to_string()
}

fn default_bot_handle() -> String {
    "dsai_trial_bot".to_string()
}

fn default_domain_url() -> String {
    "https://dsat-ft1-z7w5.onrender.com".to_string()
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("dbs.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            llama_model: default_llama_model(),
            deepseek_model: default_deepseek_model(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            bot_handle: default_bot_handle(),
            domain_url: default_domain_url(),
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            artifact_path: default_artifact_path(),
        }
    }
}

impl TelegramConfig {
    /// Public link to the bot shown on the `/telegram` page.
    pub fn bot_link(&self) -> String {
        format!("https://t.me/{}", self.bot_handle)
    }

    /// URL registered with Telegram by `/setup_webhook`.
    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.domain_url.trim_end_matches('/'))
    }
}

impl Config {
    /// Load the config file (if present), apply environment overrides and
    /// check that both secrets are set.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            info!(
                "No config file at {}, using defaults and environment",
                path.display()
            );
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override settings from the environment. `lookup` is `std::env::var`
    /// outside of tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // `groq` is the variable name older deployments used.
        if let Some(key) = non_empty("GROQ_API_KEY").or_else(|| non_empty("groq")) {
            self.llm.api_key = key;
        }
        if let Some(token) = non_empty("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(port) = non_empty("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            anyhow::bail!("Missing completion API key: set GROQ_API_KEY or [llm] api_key");
        }
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("Missing Telegram bot token: set TELEGRAM_BOT_TOKEN or [telegram] bot_token");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
