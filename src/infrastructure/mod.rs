//! 基础设施层
//!
//! 提供容器实现与进程级默认容器

// 容器实现
pub mod container;
pub mod global;

// 重新导出API
pub use container::{Concrete, Container, Parameters, ServiceId, Symbol};
