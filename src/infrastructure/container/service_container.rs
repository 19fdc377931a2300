//! 服务容器实现
//!
//! 四张表：
//! - 绑定表：标识符 -> 构造策略与共享标记
//! - 实例缓存：已解析的共享实例
//! - 别名表：别名 -> 目标标识符
//! - 扩展器表：规范标识符 -> 有序的装饰函数
//!
//! 每张表都是 `DashMap`，不同标识符之间互不争用。同一标识符上的读改写
//! （绑定、注册实例、扩展、构建并缓存）由该标识符独占的可重入锁串行化；
//! 命中缓存的读取不加锁。执行用户代码（工厂、构造器、扩展器）时不持有
//! 任何表的守卫，因此工厂可以再次进入容器。

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::concrete::{Concrete, Parameters, Service};
use super::identifier::ServiceId;
use super::stats::{ContainerStats, InnerStats};
use crate::config::ContainerConfig;
use crate::error::{BoxError, ContainerError, Result};
use crate::logging::OperationTimer;

/// 擦除后的扩展器
pub type Extender =
    Arc<dyn Fn(Service, &Container) -> std::result::Result<Service, BoxError> + Send + Sync>;

/// 绑定信息
#[derive(Debug, Clone)]
pub struct Binding {
    concrete: Concrete,
    shared: bool,
    dependencies: Vec<ServiceId>,
    /// 注册时的代数，重新绑定后旧代的构建结果不再写入缓存
    generation: u64,
}

impl Binding {
    pub fn concrete(&self) -> &Concrete {
        &self.concrete
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn dependencies(&self) -> &[ServiceId] {
        &self.dependencies
    }
}

/// 服务容器
///
/// 克隆代价很低，所有克隆共享同一组表。
///
/// ```
/// use service_container::{Concrete, Container};
///
/// let container = Container::new();
/// container.bind("name", Concrete::from_fn(|| "Ludicolo"), false)?;
///
/// let name = container.make::<&str>("name")?;
/// assert_eq!(*name, "Ludicolo");
/// # Ok::<(), service_container::ContainerError>(())
/// ```
#[derive(Clone)]
pub struct Container {
    bindings: Arc<DashMap<ServiceId, Binding>>,
    instances: Arc<DashMap<ServiceId, Service>>,
    aliases: Arc<DashMap<ServiceId, ServiceId>>,
    extenders: Arc<DashMap<ServiceId, Vec<Extender>>>,
    /// 每个标识符的临界区锁
    locks: Arc<DashMap<ServiceId, Arc<ReentrantMutex<()>>>>,
    generation: Arc<AtomicU64>,
    stats: Arc<InnerStats>,
    config: Arc<ContainerConfig>,
}

impl Container {
    /// 创建新的容器实例
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            bindings: Arc::new(DashMap::new()),
            instances: Arc::new(DashMap::new()),
            aliases: Arc::new(DashMap::new()),
            extenders: Arc::new(DashMap::new()),
            locks: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            stats: Arc::new(InnerStats::default()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    // ===== 查询 =====

    /// 是否已绑定（有绑定、有缓存实例或是别名）
    pub fn bound(&self, id: impl Into<ServiceId>) -> bool {
        let id = id.into();
        self.bindings.contains_key(&id) || self.instances.contains_key(&id) || self.is_alias(&id)
    }

    /// 规范标识符是否已有缓存实例；别名链成环时返回 false
    pub fn resolved(&self, id: impl Into<ServiceId>) -> bool {
        match self.canonicalize(id.into()) {
            Ok(id) => self.instances.contains_key(&id),
            Err(_) => false,
        }
    }

    /// 是否共享：已有缓存实例，或绑定标记为共享
    pub fn is_shared(&self, id: impl Into<ServiceId>) -> bool {
        let id = id.into();
        self.instances.contains_key(&id)
            || self
                .bindings
                .get(&id)
                .map(|binding| binding.shared)
                .unwrap_or(false)
    }

    pub fn is_alias(&self, id: impl Into<ServiceId>) -> bool {
        self.aliases.contains_key(&id.into())
    }

    /// 沿别名链得到规范标识符
    pub fn get_alias(&self, id: impl Into<ServiceId>) -> Result<ServiceId> {
        self.canonicalize(id.into())
    }

    /// 当前绑定的标识符
    pub fn registered_ids(&self) -> Vec<ServiceId> {
        self.bindings.iter().map(|entry| entry.key().clone()).collect()
    }

    /// 取出绑定信息的副本
    pub fn binding(&self, id: impl Into<ServiceId>) -> Option<Binding> {
        self.bindings.get(&id.into()).map(|binding| binding.value().clone())
    }

    // ===== 注册 =====

    /// 注册绑定
    ///
    /// 不提供构造策略时，标识符本身必须是可实例化类型引用
    /// （[`ServiceId::constructible`]），否则返回 [`ContainerError::Binding`]。
    pub fn bind(
        &self,
        id: impl Into<ServiceId>,
        concrete: impl Into<Option<Concrete>>,
        shared: bool,
    ) -> Result<()> {
        self.bind_with_dependencies(id, concrete, shared, Vec::<ServiceId>::new())
    }

    /// 注册带依赖的绑定
    ///
    /// 构建前依次解析每个依赖，放在调用参数之前传给构造策略。
    pub fn bind_with_dependencies<I, D>(
        &self,
        id: impl Into<ServiceId>,
        concrete: impl Into<Option<Concrete>>,
        shared: bool,
        dependencies: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = D>,
        D: Into<ServiceId>,
    {
        let id = id.into();

        let concrete = match concrete.into() {
            Some(concrete) => concrete,
            None => match self_binding(&id) {
                Some(concrete) => concrete,
                None => return Err(ContainerError::Binding { id }),
            },
        };

        let binding = Binding {
            concrete,
            shared,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            generation: self.generation.fetch_add(1, Ordering::Relaxed) + 1,
        };

        let lock = self.id_lock(&id);
        let _guard = lock.lock();

        self.drop_stale_instances(&id);

        debug!(
            service = %id,
            shared,
            dependencies = binding.dependencies.len(),
            "Binding registered"
        );
        self.bindings.insert(id, binding);

        Ok(())
    }

    /// 未绑定时才注册
    pub fn bind_if(
        &self,
        id: impl Into<ServiceId>,
        concrete: impl Into<Option<Concrete>>,
        shared: bool,
    ) -> Result<()> {
        let id = id.into();
        if self.bound(&id) {
            trace!(service = %id, "Already bound, skipping");
            return Ok(());
        }

        self.bind(id, concrete, shared)
    }

    /// 注册共享绑定
    pub fn singleton(
        &self,
        id: impl Into<ServiceId>,
        concrete: impl Into<Option<Concrete>>,
    ) -> Result<()> {
        self.bind(id, concrete, true)
    }

    pub fn singleton_if(
        &self,
        id: impl Into<ServiceId>,
        concrete: impl Into<Option<Concrete>>,
    ) -> Result<()> {
        self.bind_if(id, concrete, true)
    }

    /// 直接注册实例，返回该实例
    pub fn instance<T: Send + Sync + 'static>(&self, id: impl Into<ServiceId>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.instance_service(id, value.clone());
        value
    }

    /// 注册已擦除的实例
    pub fn instance_service(&self, id: impl Into<ServiceId>, value: Service) -> Service {
        let id = id.into();

        let lock = self.id_lock(&id);
        let _guard = lock.lock();

        self.aliases.remove(&id);

        debug!(service = %id, "Instance registered");
        self.instances.insert(id, value.clone());

        value
    }

    /// 记录 `alias -> id`，注册时不做校验
    pub fn alias(&self, id: impl Into<ServiceId>, alias: impl Into<ServiceId>) {
        let id = id.into();
        let alias = alias.into();

        let lock = self.id_lock(&alias);
        let _guard = lock.lock();

        self.instances.remove(&alias);

        debug!(service = %id, alias = %alias, "Alias registered");
        self.aliases.insert(alias, id);
    }

    // ===== 扩展 =====

    /// 注册类型化扩展器
    ///
    /// 已有缓存实例时立即应用并覆盖缓存，否则在下次构建时应用。
    pub fn extend<T, U, F>(&self, id: impl Into<ServiceId>, extender: F) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + Sync + 'static,
        F: Fn(Arc<T>, &Container) -> std::result::Result<U, BoxError> + Send + Sync + 'static,
    {
        let id = self.canonicalize(id.into())?;

        let target = id.clone();
        let erased = move |value: Service,
                           container: &Container|
              -> std::result::Result<Service, BoxError> {
            let typed = value.downcast::<T>().map_err(|_| ContainerError::TypeCastFailed {
                id: target.clone(),
                expected: std::any::type_name::<T>(),
            })?;
            let extended = extender(typed, container)?;
            Ok(Arc::new(extended))
        };

        self.push_extender(id, Arc::new(erased))
    }

    /// 注册擦除扩展器
    pub fn extend_service<F>(&self, id: impl Into<ServiceId>, extender: F) -> Result<()>
    where
        F: Fn(Service, &Container) -> std::result::Result<Service, BoxError> + Send + Sync + 'static,
    {
        let id = self.canonicalize(id.into())?;
        self.push_extender(id, Arc::new(extender))
    }

    /// 读取缓存、应用、写回在同一个临界区内完成
    fn push_extender(&self, id: ServiceId, extender: Extender) -> Result<()> {
        let lock = self.id_lock(&id);
        let _guard = lock.lock();

        if let Some(current) = self.cached(&id) {
            let extended = extender(current, self)
                .map_err(|source| ContainerError::ExtensionFailed {
                    id: id.clone(),
                    source,
                })?;

            debug!(service = %id, "Extender applied to cached instance");
            self.instances.insert(id, extended);
            return Ok(());
        }

        debug!(service = %id, "Extender deferred until next build");
        self.extenders.entry(id).or_default().push(extender);

        Ok(())
    }

    /// 清空扩展器列表，不影响已缓存的实例
    pub fn forget_extenders(&self, id: impl Into<ServiceId>) -> Result<()> {
        let id = self.canonicalize(id.into())?;

        let lock = self.id_lock(&id);
        let _guard = lock.lock();

        self.extenders.remove(&id);
        Ok(())
    }

    // ===== 解析 =====

    /// 解析服务 - 主要API
    pub fn make<T: Send + Sync + 'static>(&self, id: impl Into<ServiceId>) -> Result<Arc<T>> {
        self.make_with(id, Parameters::new())
    }

    /// 带调用参数解析服务
    pub fn make_with<T: Send + Sync + 'static>(
        &self,
        id: impl Into<ServiceId>,
        params: Parameters,
    ) -> Result<Arc<T>> {
        let id = id.into();
        let service = self.resolve_with(&id, params)?;

        downcast_service(&id, service)
    }

    /// 解析为擦除实例
    pub fn resolve(&self, id: impl Into<ServiceId>) -> Result<Service> {
        self.resolve_with(id, Parameters::new())
    }

    pub fn resolve_with(&self, id: impl Into<ServiceId>, params: Parameters) -> Result<Service> {
        let id = id.into();
        let mut stack = Vec::new();

        let result = self.resolve_inner(id.clone(), params, &mut stack);
        if let Err(error) = &result {
            if self.config.stats_enabled {
                self.stats.record_failure();
            }
            warn!(service = %id, error = %error, "Service resolution failed");
        }

        result
    }

    fn resolve_inner(
        &self,
        id: ServiceId,
        params: Parameters,
        stack: &mut Vec<ServiceId>,
    ) -> Result<Service> {
        if self.config.stats_enabled {
            self.stats.record_resolution();
        }

        let id = self.canonicalize(id)?;

        if let Some(instance) = self.cached(&id) {
            return Ok(self.cache_hit(&id, instance));
        }

        if stack.contains(&id) {
            let mut chain = stack.clone();
            chain.push(id.clone());
            return Err(ContainerError::CircularDependency {
                chain,
                cycle_point: id,
            });
        }

        let lock = self.id_lock(&id);
        let _guard = lock.lock();

        // 等锁期间其他线程可能已经构建完成
        if let Some(instance) = self.cached(&id) {
            return Ok(self.cache_hit(&id, instance));
        }

        let binding = self
            .bindings
            .get(&id)
            .map(|binding| binding.value().clone())
            .ok_or_else(|| ContainerError::BindingResolution { id: id.clone() })?;

        stack.push(id.clone());
        let built = self.build(&id, &binding, params, stack);
        stack.pop();

        let object = self.apply_extenders(&id, built?)?;

        if binding.shared || self.instances.contains_key(&id) {
            self.cache_if_current(&id, &binding, object.clone());
        }

        self.log_resolution(&id, "built");
        Ok(object)
    }

    fn cache_hit(&self, id: &ServiceId, instance: Service) -> Service {
        if self.config.stats_enabled {
            self.stats.record_cache_hit();
        }
        self.log_resolution(id, "cache hit");
        instance
    }

    /// 只有构建所用的绑定仍是当前绑定时才写入缓存
    ///
    /// 写入期间持有绑定表的读守卫，`flush` 要么在写入之后清空缓存，
    /// 要么在写入之前移除绑定。
    fn cache_if_current(&self, id: &ServiceId, binding: &Binding, object: Service) {
        if let Some(current) = self.bindings.get(id) {
            if current.generation == binding.generation {
                self.instances.insert(id.clone(), object);
            }
        }
    }

    fn build(
        &self,
        id: &ServiceId,
        binding: &Binding,
        params: Parameters,
        stack: &mut Vec<ServiceId>,
    ) -> Result<Service> {
        let params = if binding.dependencies.is_empty() {
            params
        } else {
            let resolved = binding
                .dependencies
                .iter()
                .map(|dependency| self.resolve_inner(dependency.clone(), Parameters::new(), stack))
                .collect::<Result<Vec<_>>>()?;
            params.prepend(resolved)
        };

        if self.config.stats_enabled {
            self.stats.record_build();
        }

        let timer = self
            .config
            .log_resolutions
            .then(|| OperationTimer::new(&format!("build {}", id)));

        let result = binding
            .concrete
            .build(self, &params)
            .map_err(|source| ContainerError::CreationFailed {
                id: id.clone(),
                source,
            });

        if let Some(timer) = timer {
            timer.finish();
        }

        result
    }

    fn apply_extenders(&self, id: &ServiceId, object: Service) -> Result<Service> {
        let extenders = match self.extenders.get(id) {
            Some(extenders) => extenders.value().clone(),
            None => return Ok(object),
        };

        extenders.iter().try_fold(object, |value, extender| {
            extender(value, self).map_err(|source| ContainerError::ExtensionFailed {
                id: id.clone(),
                source,
            })
        })
    }

    /// 沿别名链前进，任何重复出现的标识符都视为环
    fn canonicalize(&self, id: ServiceId) -> Result<ServiceId> {
        let mut chain: Vec<ServiceId> = Vec::new();
        let mut current = id;

        loop {
            let next = match self.aliases.get(&current) {
                Some(target) => target.value().clone(),
                None => return Ok(current),
            };

            chain.push(current);
            if chain.contains(&next) {
                chain.push(next.clone());
                return Err(ContainerError::Alias { id: next, chain });
            }

            current = next;
        }
    }

    /// 取出标识符的锁，返回前释放表守卫
    fn id_lock(&self, id: &ServiceId) -> Arc<ReentrantMutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
            .clone()
    }

    fn cached(&self, id: &ServiceId) -> Option<Service> {
        self.instances.get(id).map(|instance| instance.value().clone())
    }

    fn log_resolution(&self, id: &ServiceId, outcome: &'static str) {
        if self.config.log_resolutions {
            debug!(service = %id, outcome, "Service resolved");
        } else {
            trace!(service = %id, outcome, "Service resolved");
        }
    }

    // ===== 清理 =====

    fn drop_stale_instances(&self, id: &ServiceId) {
        self.instances.remove(id);
        self.aliases.remove(id);
    }

    /// 只移除字面键下的缓存实例，不走别名
    pub fn forget_instance(&self, id: impl Into<ServiceId>) {
        let id = id.into();

        let lock = self.id_lock(&id);
        let _guard = lock.lock();

        self.instances.remove(&id);
    }

    pub fn forget_instances(&self) {
        self.instances.clear();
    }

    /// 清空全部状态（绑定、实例、别名、扩展器）
    pub fn flush(&self) {
        self.bindings.clear();
        self.instances.clear();
        self.aliases.clear();
        self.extenders.clear();
        debug!("Container flushed");
    }

    // ===== 统计 =====

    /// 获取容器统计信息
    pub fn stats(&self) -> ContainerStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// 可实例化类型引用绑定到自身时使用的策略
fn self_binding(id: &ServiceId) -> Option<Concrete> {
    match id {
        ServiceId::Type {
            type_name,
            constructor: Some(constructor),
            ..
        } => Some(Concrete::Constructible {
            type_name: *type_name,
            constructor: *constructor,
        }),
        _ => None,
    }
}

fn downcast_service<T: Send + Sync + 'static>(id: &ServiceId, service: Service) -> Result<Arc<T>> {
    service
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeCastFailed {
            id: id.clone(),
            expected: std::any::type_name::<T>(),
        })
}
