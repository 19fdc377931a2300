//! 容器错误类型

use thiserror::Error;

use crate::infrastructure::container::ServiceId;

/// 工厂、构造器与扩展器返回的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 未提供构造策略，且标识符本身不可实例化
    #[error("{id} cannot be bound to itself, as it is not instantiable")]
    Binding { id: ServiceId },

    /// 既没有绑定也没有缓存实例
    #[error("Target {id} is not instantiable")]
    BindingResolution { id: ServiceId },

    /// 别名链自引用或成环
    #[error("{id} is aliased to itself (chain: {})", format_chain(.chain))]
    Alias { id: ServiceId, chain: Vec<ServiceId> },

    /// 声明的依赖形成循环
    #[error("Circular dependency detected in chain: {}. Cycle at: {cycle_point}", format_chain(.chain))]
    CircularDependency {
        chain: Vec<ServiceId>,
        cycle_point: ServiceId,
    },

    /// 服务创建失败
    #[error("Failed to create service '{id}': {source}")]
    CreationFailed {
        id: ServiceId,
        #[source]
        source: BoxError,
    },

    /// 扩展器执行失败
    #[error("Extender for service '{id}' failed: {source}")]
    ExtensionFailed {
        id: ServiceId,
        #[source]
        source: BoxError,
    },

    /// 类型转换失败
    #[error("Type cast failed for service '{id}': expected '{expected}'")]
    TypeCastFailed { id: ServiceId, expected: &'static str },

    /// 参数下标越界
    #[error("Missing parameter at index {index} ({len} supplied)")]
    MissingParameter { index: usize, len: usize },
}

impl ContainerError {
    /// 是否为配置缺口（未绑定）类错误
    pub fn is_unbound(&self) -> bool {
        matches!(self, ContainerError::BindingResolution { .. })
    }

    /// 是否为别名链错误
    pub fn is_alias_error(&self) -> bool {
        matches!(self, ContainerError::Alias { .. })
    }
}

fn format_chain(chain: &[ServiceId]) -> String {
    chain
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for environment variable {key}")]
    InvalidEnv { key: String, value: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ContainerError>;
