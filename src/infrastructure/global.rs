//! 进程级默认容器
//!
//! 首次访问时按环境变量配置创建。测试之间用 [`reset`] 隔离。

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::container::Container;
use crate::config::ContainerConfig;

lazy_static::lazy_static! {
    static ref GLOBAL_CONTAINER: RwLock<Option<Container>> = RwLock::new(None);
}

/// 获取全局容器
pub fn container() -> Container {
    let existing = GLOBAL_CONTAINER.read().clone();
    if let Some(container) = existing {
        return container;
    }

    let mut slot = GLOBAL_CONTAINER.write();
    slot.get_or_insert_with(|| {
        let config = ContainerConfig::from_env().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid container environment config, using defaults");
            ContainerConfig::default()
        });
        debug!(?config, "Global container created");
        Container::with_config(config)
    })
    .clone()
}

/// 替换全局容器，传入 None 时下次访问重新创建
pub fn set_container(container: Option<Container>) {
    *GLOBAL_CONTAINER.write() = container;
}

/// 丢弃全局容器
pub fn reset() {
    set_container(None);
}

/// 全局容器是否已经创建
pub fn is_initialized() -> bool {
    GLOBAL_CONTAINER.read().is_some()
}
