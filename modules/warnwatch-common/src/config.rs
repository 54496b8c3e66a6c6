use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::{WatchError, WatchResult};

pub const DEFAULT_THRESHOLD: u8 = 85;
pub const DEFAULT_PAGE_URL: &str = "https://edd.ca.gov/en/jobs_and_training/Layoff_Services_WARN/";
const WEBHOOK_ENV: &str = "WARNWATCH_WEBHOOK_URL";
const SMTP_SENDER_EMAIL_ENV: &str = "SMTP_SENDER_EMAIL";
const SMTP_SENDER_PASSWORD_ENV: &str = "SMTP_SENDER_PASSWORD";
const SMTP_RECIPIENT_EMAIL_ENV: &str = "SMTP_RECIPIENT_EMAIL";

/// TOML-backed monitor configuration. Built once at startup and passed by
/// reference; nothing reads configuration from ambient state after that.
/// Secrets (webhook URL, SMTP credentials) may come from env instead of the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    pub watch: WatchSection,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    pub targets: Vec<String>,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default = "default_page_url")]
    pub page_url: String,
    /// Preferred sheet; falls back to `sheet_index` when absent from the workbook.
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub sheet_index: usize,
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    #[serde(default = "default_true")]
    pub console: bool,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub email: EmailConfig,
}

/// `[notify.email]`. Enabled by default; without a complete sender,
/// password and recipient the email notifier is skipped with a warning.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub sender_password: Option<String>,
    #[serde(default)]
    pub recipient_email: Option<String>,
}

/// SMTP settings with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

impl EmailConfig {
    /// Complete SMTP settings, or `None` if sender, password or recipient is
    /// missing or blank.
    pub fn settings(&self) -> Option<SmtpSettings> {
        fn present(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        Some(SmtpSettings {
            server: self.smtp_server.clone(),
            port: self.smtp_port,
            sender: present(&self.sender_email)?,
            password: present(&self.sender_password)?,
            recipient: present(&self.recipient_email)?,
        })
    }
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

fn default_state_file() -> PathBuf {
    PathBuf::from("warn_state.json")
}

fn default_page_url() -> String {
    DEFAULT_PAGE_URL.to_string()
}

fn default_page_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            page_url: default_page_url(),
            sheet_name: None,
            sheet_index: 0,
            page_timeout_secs: default_page_timeout(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            console: true,
            webhook_url: None,
            email: EmailConfig::default(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            sender_email: None,
            sender_password: None,
            recipient_email: None,
        }
    }
}

impl WatchConfig {
    /// Config for the given targets with every other field defaulted.
    pub fn for_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watch: WatchSection {
                targets: targets.into_iter().map(Into::into).collect(),
                threshold: DEFAULT_THRESHOLD,
                state_file: default_state_file(),
            },
            source: SourceConfig::default(),
            notify: NotifyConfig::default(),
        }
    }

    /// Read and validate a TOML config file, then apply env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: WatchConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Non-blank values from `lookup` override the file.
    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = get(WEBHOOK_ENV) {
            self.notify.webhook_url = Some(url);
        }
        let email = &mut self.notify.email;
        if let Some(sender) = get(SMTP_SENDER_EMAIL_ENV) {
            email.sender_email = Some(sender);
        }
        if let Some(password) = get(SMTP_SENDER_PASSWORD_ENV) {
            email.sender_password = Some(password);
        }
        if let Some(recipient) = get(SMTP_RECIPIENT_EMAIL_ENV) {
            email.recipient_email = Some(recipient);
        }
    }

    pub fn validate(&self) -> WatchResult<()> {
        if self.watch.targets.is_empty() {
            return Err(WatchError::Config("watch.targets must not be empty".into()));
        }
        if self.watch.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(WatchError::Config("watch.targets contains a blank name".into()));
        }
        if self.watch.threshold > 100 {
            return Err(WatchError::Config(format!(
                "watch.threshold must be 0..=100, got {}",
                self.watch.threshold
            )));
        }
        Ok(())
    }

    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.char_indices().nth(12).map(|(i, _)| i).unwrap_or(val.len());
            format!("{}...({} chars)", &val[..n], val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  targets: {:?}", self.watch.targets);
        tracing::info!("  threshold: {}", self.watch.threshold);
        tracing::info!("  state_file: {}", self.watch.state_file.display());
        tracing::info!("  page_url: {}", self.source.page_url);
        tracing::info!(
            "  webhook_url: {}",
            self.notify
                .webhook_url
                .as_deref()
                .map(preview)
                .unwrap_or_else(|| "<not set>".to_string())
        );
        let email = &self.notify.email;
        tracing::info!(
            "  email: enabled={} server={}:{} sender={} password={} recipient={}",
            email.enabled,
            email.smtp_server,
            email.smtp_port,
            email.sender_email.as_deref().unwrap_or("<not set>"),
            if email.sender_password.is_some() { "<set>" } else { "<not set>" },
            email.recipient_email.as_deref().unwrap_or("<not set>"),
        );
    }
}
