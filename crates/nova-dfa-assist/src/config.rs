use std::path::Path;
use std::sync::Once;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Upper bound on pairwise inequalities seeded between distinct live objects.
pub const DEFAULT_MAX_DISTINCT_PAIRS: usize = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a snippet of the input; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct DfaAssistConfig {
    /// Run the assist when the debugger pauses.
    #[serde(default = "DfaAssistConfig::default_enabled")]
    pub enabled: bool,

    /// Maximum number of "these two live objects differ" facts added to the
    /// seeded state. Pairs beyond the bound are dropped.
    #[serde(default = "DfaAssistConfig::default_max_distinct_pairs")]
    pub max_distinct_pairs: usize,

    /// Interpreter step budget for one run.
    #[serde(default = "DfaAssistConfig::default_max_interpreter_steps")]
    #[schemars(range(min = 1))]
    pub max_interpreter_steps: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DfaAssistConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_max_distinct_pairs() -> usize {
        DEFAULT_MAX_DISTINCT_PAIRS
    }

    fn default_max_interpreter_steps() -> usize {
        nova_flow::DEFAULT_MAX_STEPS
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DfaAssistConfig)
    }
}

impl Default for DfaAssistConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            max_distinct_pairs: Self::default_max_distinct_pairs(),
            max_interpreter_steps: Self::default_max_interpreter_steps(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Either a simple level (`info`, `debug`, ...) or an `EnvFilter`
    /// directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The effective filter: the configured level, merged with `RUST_LOG` when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        match env_directives {
            Some(env_directives) => {
                let combined = format!(
                    "{},{env_directives}",
                    Self::normalize_level_directives(&self.level)
                );
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber. Only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let writer = if !config.stderr {
            BoxMakeWriter::new(std::io::sink)
        } else if cfg!(debug_assertions) {
            // Keeps `cargo test` output captured.
            BoxMakeWriter::new(tracing_subscriber::fmt::writer::TestWriter::with_stderr)
        } else {
            BoxMakeWriter::new(std::io::stderr)
        };

        let builder = tracing_subscriber::fmt()
            .with_env_filter(config.env_filter())
            .with_writer(writer);
        // Another subscriber (e.g. the host's) may already be installed.
        let _ = if config.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
    });
}
