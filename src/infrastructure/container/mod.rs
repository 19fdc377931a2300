//! Container module

pub mod concrete;
pub mod identifier;
pub mod service_container;
pub mod stats;

// Re-export primary types
pub use concrete::{Concrete, Constructible, ConstructorFn, FactoryFn, Parameters, Service};
pub use identifier::{ServiceId, Symbol};
pub use service_container::{Binding, Container, Extender};
pub use stats::ContainerStats;
