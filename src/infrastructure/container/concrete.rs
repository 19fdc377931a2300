//! 构造策略与调用参数

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::service_container::Container;
use crate::error::{BoxError, ContainerError, Result};

/// 类型擦除后的服务实例
pub type Service = Arc<dyn Any + Send + Sync>;

/// 可实例化类型的擦除构造器
pub type ConstructorFn = fn(&Parameters) -> std::result::Result<Service, BoxError>;

/// 擦除后的工厂闭包
pub type FactoryFn =
    Arc<dyn Fn(&Container, &Parameters) -> std::result::Result<Service, BoxError> + Send + Sync>;

/// 可以直接"new"出来的服务类型
///
/// 实现该 trait 的类型可以通过 [`ServiceId::constructible`] 绑定到自身，
/// 也可以作为 [`Concrete::constructible`] 的构造策略。
///
/// [`ServiceId::constructible`]: super::ServiceId::constructible
pub trait Constructible: Send + Sync + Sized + 'static {
    /// 使用调用时参数构造实例
    fn construct(params: &Parameters) -> std::result::Result<Self, BoxError>;
}

pub(crate) fn construct_erased<T: Constructible>(
    params: &Parameters,
) -> std::result::Result<Service, BoxError> {
    let value = T::construct(params)?;
    Ok(Arc::new(value))
}

/// 构造策略
///
/// 在注册时显式确定，解析时不再做任何类型探测。
#[derive(Clone)]
pub enum Concrete {
    /// 可实例化类型，只接收调用参数
    Constructible {
        type_name: &'static str,
        constructor: ConstructorFn,
    },
    /// 工厂函数，接收容器和调用参数
    Factory(FactoryFn),
}

impl Concrete {
    pub fn constructible<T: Constructible>() -> Self {
        Concrete::Constructible {
            type_name: std::any::type_name::<T>(),
            constructor: construct_erased::<T>,
        }
    }

    /// 工厂策略
    pub fn factory<T, F>(factory: F) -> Self
    where
        F: Fn(&Container, &Parameters) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let erased = move |container: &Container,
                           params: &Parameters|
              -> std::result::Result<Service, BoxError> {
            let service = factory(container, params)?;
            Ok(Arc::new(service))
        };
        Concrete::Factory(Arc::new(erased))
    }

    /// 不关心容器与参数的工厂 - 便捷方法
    pub fn from_fn<T, F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        Self::factory(move |_, _| Ok(factory()))
    }

    /// 直接产出擦除实例的工厂
    pub fn erased<F>(factory: F) -> Self
    where
        F: Fn(&Container, &Parameters) -> std::result::Result<Service, BoxError> + Send + Sync + 'static,
    {
        Concrete::Factory(Arc::new(factory))
    }

    pub fn is_constructible(&self) -> bool {
        matches!(self, Concrete::Constructible { .. })
    }

    pub(crate) fn build(
        &self,
        container: &Container,
        params: &Parameters,
    ) -> std::result::Result<Service, BoxError> {
        match self {
            Concrete::Constructible { constructor, .. } => constructor(params),
            Concrete::Factory(factory) => factory(container, params),
        }
    }
}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concrete::Constructible { type_name, .. } => {
                f.debug_tuple("Constructible").field(type_name).finish()
            }
            Concrete::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// 调用时参数
///
/// 按顺序保存的类型擦除值。声明了依赖的绑定在构建时会把依赖放在最前面。
#[derive(Clone, Default)]
pub struct Parameters {
    values: Vec<Service>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个参数
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.push(Arc::new(value));
        self
    }

    /// 追加一个已擦除的参数
    pub fn with_service(mut self, value: Service) -> Self {
        self.values.push(value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn raw(&self, index: usize) -> Option<&Service> {
        self.values.get(index)
    }

    /// 按下标取出类型化参数，下标越界或类型不符时返回 None
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.values
            .get(index)
            .and_then(|value| value.clone().downcast::<T>().ok())
    }

    /// 按下标取出类型化参数
    pub fn require<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        let value = self.values.get(index).ok_or(ContainerError::MissingParameter {
            index,
            len: self.values.len(),
        })?;

        value
            .clone()
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeCastFailed {
                id: format!("parameter #{}", index).into(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// 在当前参数前插入依赖
    pub(crate) fn prepend(self, mut leading: Vec<Service>) -> Self {
        leading.extend(self.values);
        Self { values: leading }
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters")
            .field("len", &self.values.len())
            .finish()
    }
}

impl FromIterator<Service> for Parameters {
    fn from_iter<I: IntoIterator<Item = Service>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i32,
        y: i32,
    }

    impl Constructible for Point {
        fn construct(params: &Parameters) -> std::result::Result<Self, BoxError> {
            let x = params.require::<i32>(0)?;
            let y = params.require::<i32>(1)?;
            Ok(Point { x: *x, y: *y })
        }
    }

    #[test]
    fn test_parameters_typed_access() {
        let params = Parameters::new().with(7_i32).with(String::from("seven"));

        assert_eq!(params.len(), 2);
        assert_eq!(*params.get::<i32>(0).unwrap(), 7);
        assert_eq!(params.get::<String>(1).unwrap().as_str(), "seven");
        assert!(params.get::<i32>(1).is_none());
        assert!(params.get::<i32>(5).is_none());
    }

    #[test]
    fn test_parameters_require_errors() {
        let params = Parameters::new().with(1_u8);

        assert!(matches!(
            params.require::<u8>(3),
            Err(ContainerError::MissingParameter { index: 3, len: 1 })
        ));
        assert!(matches!(
            params.require::<String>(0),
            Err(ContainerError::TypeCastFailed { .. })
        ));
    }

    #[test]
    fn test_constructible_strategy() {
        let concrete = Concrete::constructible::<Point>();
        assert!(concrete.is_constructible());

        let container = Container::new();
        let params = Parameters::new().with(3_i32).with(4_i32);
        let built = concrete.build(&container, &params).unwrap();
        let point = built.downcast::<Point>().unwrap();
        assert_eq!((point.x, point.y), (3, 4));

        assert!(concrete.build(&container, &Parameters::new()).is_err());
    }

    #[test]
    fn test_prepend_keeps_order() {
        let params = Parameters::new().with(2_i32).prepend(vec![Arc::new(1_i32) as Service]);

        assert_eq!(*params.get::<i32>(0).unwrap(), 1);
        assert_eq!(*params.get::<i32>(1).unwrap(), 2);
    }
}
