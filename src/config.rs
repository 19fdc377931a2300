//! 容器配置
//!
//! 从 TOML 文件读取，环境变量优先。

use serde::Deserialize;
use std::{collections::HashMap, env, fs, path::Path};

use crate::error::ConfigError;

/// 是否收集解析统计
pub const ENV_STATS: &str = "SERVICE_CONTAINER_STATS";
/// 解析事件以 `debug` 而不是 `trace` 级别输出
pub const ENV_LOG_RESOLUTIONS: &str = "SERVICE_CONTAINER_LOG_RESOLUTIONS";

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// 是否收集解析统计
    pub stats_enabled: bool,
    /// 是否以 debug 级别记录每次解析并为构建计时
    pub log_resolutions: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            stats_enabled: true,
            log_resolutions: false,
        }
    }
}

/// 配置文件中的原始内容，所有字段可选
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialContainerConfig {
    stats_enabled: Option<bool>,
    log_resolutions: Option<bool>,
}

impl ContainerConfig {
    /// 从 TOML 文件加载配置，再应用环境变量覆盖
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;

        let partial = Self::parse_partial(&content)?;
        Self::from_partial_and_env(Some(partial), &Self::collect_env_vars())
    }

    /// 解析 TOML 字符串，不读取环境变量
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let partial = Self::parse_partial(content)?;
        Self::from_partial_and_env(Some(partial), &HashMap::new())
    }

    /// 默认值加环境变量覆盖
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_partial_and_env(None, &Self::collect_env_vars())
    }

    /// 合并部分配置与环境变量，环境变量优先
    pub fn from_partial_and_env(
        partial: Option<PartialContainerConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();
        let defaults = Self::default();

        let stats_enabled = match env_map.get(ENV_STATS) {
            Some(value) => parse_bool(ENV_STATS, value)?,
            None => partial.stats_enabled.unwrap_or(defaults.stats_enabled),
        };
        let log_resolutions = match env_map.get(ENV_LOG_RESOLUTIONS) {
            Some(value) => parse_bool(ENV_LOG_RESOLUTIONS, value)?,
            None => partial.log_resolutions.unwrap_or(defaults.log_resolutions),
        };

        Ok(Self {
            stats_enabled,
            log_resolutions,
        })
    }

    fn parse_partial(content: &str) -> Result<PartialContainerConfig, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn collect_env_vars() -> HashMap<String, String> {
        [ENV_STATS, ENV_LOG_RESOLUTIONS]
            .iter()
            .filter_map(|key| env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
