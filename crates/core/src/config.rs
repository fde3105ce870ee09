use crate::allowlist::DEFAULT_ALLOW_LIST_FILE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub allow_list: AllowListConfig,
    pub moves: MoveConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowListConfig {
    pub path: String,
}

impl Default for AllowListConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_ALLOW_LIST_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveConfig {
    /// rename|skip|overwrite
    pub conflict: String,
    pub copy_then_delete: bool,
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            conflict: "rename".to_string(),
            copy_then_delete: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(config::Environment::with_prefix("DIRSCOUT").separator("__"));
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
