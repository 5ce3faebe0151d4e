use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration. The `i18n` and `hosting` sections are
/// required at bootstrap time but kept optional here so that a missing
/// section can be reported as a typed host error instead of a generic
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub i18n: Option<I18nSection>,
    #[serde(default)]
    pub hosting: Option<HostingSection>,
}

/// Localization store settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct I18nSection {
    /// Folder holding `<language>.json` statement files. Supports the
    /// `./` (execution dir) and `~/` (work root) prefixes.
    #[serde(default)]
    pub path: String,
    /// Language identifier, e.g. "en_us".
    #[serde(default)]
    pub language: String,
}

/// Host settings: HTTP endpoint, unit search paths, library list,
/// logging sink, CORS policy and documentation groups.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostingSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Extra unit search roots, resolved after the execution directory.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Logical names of binary units imported at startup (best-effort).
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default = "default_log_path")]
    pub log_path: String,
    /// Console log level for the default sink.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// When true, an allow-all CORS policy is applied to the pipeline.
    #[serde(default)]
    pub cors_all: bool,
    /// API documentation groups exposed under /api-docs.
    #[serde(default)]
    pub docs: Vec<DocGroup>,
}

/// One API documentation group. `keyword` selects the operations the group
/// covers: `*` matches everything, anything else is a path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DocGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_keyword")]
    pub keyword: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8087
}

fn default_log_path() -> String {
    "./logs/quay.log".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_keyword() -> String {
    "*".to_string()
}

impl Default for HostingSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            paths: Vec::new(),
            libraries: Vec::new(),
            log_path: default_log_path(),
            log_level: default_log_level(),
            cors_all: false,
            docs: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file →
    /// environment variables (`QUAY__HOSTING__PORT=8087` maps to
    /// `hosting.port`).
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(config_path.as_ref()))
            .merge(Env::prefixed("QUAY__").split("__"));

        let config: AppConfig = figment
            .extract()
            .with_context(|| "Failed to extract config from figment".to_string())?;

        Ok(config)
    }

    /// Load configuration from file, or fall back to defaults when no path
    /// was given.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        let hosting = self.hosting.get_or_insert_with(HostingSection::default);
        if let Some(port) = args.port {
            hosting.port = port;
        }
        hosting.log_level = match args.verbose {
            0 => hosting.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        };
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
}
