//! 服务容器
//!
//! 把抽象的服务标识符映射到具体的构造策略，支持共享实例缓存、别名
//! 以及解析后的扩展（装饰）。

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logging;

// Re-export commonly used items for convenience
pub use config::ContainerConfig;
pub use error::{BoxError, ConfigError, ContainerError, Result};
pub use infrastructure::container::{
    Binding, Concrete, Constructible, Container, ContainerStats, Extender, Parameters, Service,
    ServiceId, Symbol,
};
pub use infrastructure::global;
