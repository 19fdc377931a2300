//! 全局容器的集成测试
//!
//! 全局状态在同一进程内共享，所有断言放在一个测试函数里顺序执行。

use service_container::{global, Concrete, Container};

#[test]
fn test_global_container_lifecycle() {
    global::reset();
    assert!(!global::is_initialized());

    // 首次访问时创建
    let container = global::container();
    assert!(global::is_initialized());

    container
        .singleton("name", Concrete::from_fn(|| "Ludicolo"))
        .unwrap();

    // 再次访问得到同一个容器
    let again = global::container();
    assert_eq!(*again.make::<&str>("name").unwrap(), "Ludicolo");

    // 替换为显式提供的容器
    let replacement = Container::new();
    replacement.instance("name", "Lotad");
    global::set_container(Some(replacement));
    assert_eq!(*global::container().make::<&str>("name").unwrap(), "Lotad");

    // 重置后得到全新的空容器
    global::reset();
    assert!(!global::container().bound("name"));

    global::reset();
}
