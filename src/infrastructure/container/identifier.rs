//! 服务标识符

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use super::concrete::{construct_erased, Constructible, ConstructorFn};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// 唯一符号标识
///
/// 每次调用 [`Symbol::new`] 都得到一个全新的符号，与描述是否相同无关。
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Option<Cow<'static, str>>,
}

impl Symbol {
    pub fn new() -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: None,
        }
    }

    pub fn described(description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: Some(description.into()),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol#{}({})", self.id, self.description().unwrap_or(""))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

/// 服务标识符
///
/// 容器中所有表都以它为键。类型引用只按 [`TypeId`] 比较，
/// 携带的构造器不参与相等性判断。
#[derive(Clone)]
pub enum ServiceId {
    /// 字符串名称
    Name(Cow<'static, str>),
    /// 唯一符号
    Symbol(Symbol),
    /// 类型引用
    Type {
        type_id: TypeId,
        type_name: &'static str,
        constructor: Option<ConstructorFn>,
    },
}

impl ServiceId {
    /// 抽象类型引用，不能绑定到自身
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceId::Type {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructor: None,
        }
    }

    /// 可实例化的类型引用，可以不带构造策略直接绑定
    pub fn constructible<T: Constructible>() -> Self {
        ServiceId::Type {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructor: Some(construct_erased::<T>),
        }
    }

    pub fn name(name: impl Into<Cow<'static, str>>) -> Self {
        ServiceId::Name(name.into())
    }

    /// 标识符自身携带的构造器（仅可实例化类型引用才有）
    pub fn constructor(&self) -> Option<ConstructorFn> {
        match self {
            ServiceId::Type { constructor, .. } => *constructor,
            _ => None,
        }
    }

    pub fn is_constructible(&self) -> bool {
        self.constructor().is_some()
    }
}

impl PartialEq for ServiceId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ServiceId::Name(a), ServiceId::Name(b)) => a == b,
            (ServiceId::Symbol(a), ServiceId::Symbol(b)) => a == b,
            (ServiceId::Type { type_id: a, .. }, ServiceId::Type { type_id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for ServiceId {}

impl Hash for ServiceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ServiceId::Name(name) => name.hash(state),
            ServiceId::Symbol(symbol) => symbol.hash(state),
            ServiceId::Type { type_id, .. } => type_id.hash(state),
        }
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Name(name) => write!(f, "Name({:?})", name),
            ServiceId::Symbol(symbol) => write!(f, "{:?}", symbol),
            ServiceId::Type {
                type_name,
                constructor,
                ..
            } => f
                .debug_struct("Type")
                .field("type_name", type_name)
                .field("constructible", &constructor.is_some())
                .finish(),
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Name(name) => f.write_str(name),
            ServiceId::Symbol(symbol) => write!(f, "{}", symbol),
            ServiceId::Type { type_name, .. } => f.write_str(type_name),
        }
    }
}

impl From<&'static str> for ServiceId {
    fn from(name: &'static str) -> Self {
        ServiceId::Name(Cow::Borrowed(name))
    }
}

impl From<String> for ServiceId {
    fn from(name: String) -> Self {
        ServiceId::Name(Cow::Owned(name))
    }
}

impl From<Symbol> for ServiceId {
    fn from(symbol: Symbol) -> Self {
        ServiceId::Symbol(symbol)
    }
}

impl From<&Symbol> for ServiceId {
    fn from(symbol: &Symbol) -> Self {
        ServiceId::Symbol(symbol.clone())
    }
}

impl From<&ServiceId> for ServiceId {
    fn from(id: &ServiceId) -> Self {
        id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Marker;

    #[test]
    fn test_symbols_are_unique() {
        let a = Symbol::described("foo");
        let b = Symbol::described("foo");

        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.description(), Some("foo"));
    }

    #[test]
    fn test_type_ids_ignore_constructor() {
        let abstract_id = ServiceId::of::<Marker>();
        assert!(!abstract_id.is_constructible());

        let mut set = HashSet::new();
        set.insert(abstract_id);
        assert!(set.contains(&ServiceId::of::<Marker>()));
        assert!(!set.contains(&ServiceId::of::<String>()));
    }

    #[test]
    fn test_names_and_symbols_never_collide() {
        let name = ServiceId::from("foo");
        let symbol = ServiceId::from(Symbol::described("foo"));

        assert_ne!(name, symbol);
        assert_eq!(name, ServiceId::from(String::from("foo")));
        assert_eq!(name.to_string(), "foo");
        assert_eq!(symbol.to_string(), "Symbol(foo)");
    }
}
