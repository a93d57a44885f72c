use crate::probe::{ProbeOptions, DEFAULT_OBJECT_PATH, DEFAULT_PIN_PATH};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PROCSNOOP_CONFIG";

// 顶层配置结构体，所有字段都有默认值，配置文件可以只写需要覆盖的部分
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Minimum lifetime (ms) for an exit event to be reported. `0` = all.
    pub min_duration_ms: u32,
    pub object_path: PathBuf,
    pub pin_path: PathBuf,
    pub log_level: Option<String>,
    pub log_directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 0,
            object_path: PathBuf::from(DEFAULT_OBJECT_PATH),
            pin_path: PathBuf::from(DEFAULT_PIN_PATH),
            log_level: None,
            log_directory: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(config_file_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_file_path)
            .with_context(|| format!("cannot read config {}", config_file_path.display()))?;
        let loaded_config: AppConfig = serde_yaml::from_str(&config_content)
            .with_context(|| format!("invalid config {}", config_file_path.display()))?;
        Ok(loaded_config)
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            object_path: self.object_path.clone(),
            min_duration_ms: self.min_duration_ms,
            pin_path: self.pin_path.clone(),
        }
    }

    /// Level used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

/// Places searched for a config file, most specific first.
pub fn candidate_config_paths() -> Vec<PathBuf> {
    let mut cands = Vec::new();
    cands.push(PathBuf::from("./procsnoop.yaml"));
    cands.push(PathBuf::from("/etc/procsnoop/config.yaml"));
    if let Ok(home) = env::var("XDG_CONFIG_HOME") {
        cands.push(PathBuf::from(home).join("procsnoop/config.yaml"));
    }
    if let Some(home_dir) = dirs_next::home_dir() {
        cands.push(home_dir.join(".config/procsnoop/config.yaml"));
    }
    cands
}

/// Picks the config file: explicit path, then `PROCSNOOP_CONFIG`, then the
/// first existing candidate. `None` means built-in defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(explicit) = explicit {
        return Some(explicit.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    candidate_config_paths().into_iter().find(|cand| cand.exists())
}
