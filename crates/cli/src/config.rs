use config::{Config, ConfigError, Environment, File};
use engine::EngineSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_dev_env")]
    pub dev_env: String,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_dev_env() -> String {
    "dev".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// Emit one JSON object per event instead of text lines.
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub format: LoggingFormatConfig,
    #[serde(default)]
    pub levels: LoggingLevelsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingFormatConfig {
    #[serde(default)]
    pub show_time: bool,
    #[serde(default)]
    pub location: LoggingLocationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingLocationConfig {
    #[serde(default)]
    pub show_file: bool,
    #[serde(default)]
    pub show_line: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingLevelsConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub info: bool,
    #[serde(default = "true_default")]
    pub warning: bool,
    #[serde(default = "true_default")]
    pub error: bool,
    #[serde(default = "true_default")]
    pub critical: bool,
}

impl Default for LoggingLevelsConfig {
    fn default() -> Self {
        Self {
            debug: false,
            info: false,
            warning: true,
            error: true,
            critical: true,
        }
    }
}

impl LoggingLevelsConfig {
    /// The most verbose level enabled, as an `EnvFilter` directive.
    pub fn filter_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.info {
            "info"
        } else if self.warning {
            "warn"
        } else if self.error || self.critical {
            "error"
        } else {
            "off"
        }
    }
}

fn true_default() -> bool {
    true
}

static CONFIG: RwLock<Option<&'static AppConfig>> = RwLock::new(None);

pub fn get_config() -> Result<&'static AppConfig, ConfigError> {
    if let Some(cfg) = *CONFIG.read().unwrap_or_else(|e| e.into_inner()) {
        return Ok(cfg);
    }

    let mut write = CONFIG.write().unwrap_or_else(|e| e.into_inner());
    if let Some(cfg) = *write {
        return Ok(cfg);
    }

    let cfg: &'static AppConfig = Box::leak(Box::new(load_config()?));
    *write = Some(cfg);
    Ok(cfg)
}

#[cfg(test)]
pub fn reset_config() {
    let mut write = CONFIG.write().unwrap_or_else(|e| e.into_inner());
    *write = None;
}

/// Prefer the file next to the crate manifest (cargo run / cargo test),
/// fall back to the repo-root layout.
fn config_file(name: &str) -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let beside_manifest = Path::new(&manifest_dir).join(name);
    if beside_manifest.exists() {
        beside_manifest
    } else {
        Path::new("crates").join("cli").join(name)
    }
}

fn load_config() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        // Defaults are compiled in, so the shipped file is optional
        .add_source(File::from(config_file("global_config.yaml")).required(false))
        // Load local override
        .add_source(File::from(config_file(".global_config.yaml")).required(false))
        // Map nested env vars like APP__ENGINE__ERROR_RESET_MS=250
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

    builder.build()?.try_deserialize()
}
