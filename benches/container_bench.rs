#![allow(dead_code)]
//! 服务容器的性能基准测试

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use service_container::{Concrete, Container, Parameters};
use std::sync::Arc;

/// 测试用的简单服务
#[derive(Clone)]
struct SimpleService {
    value: i32,
}

/// 基准测试：共享服务解析（缓存命中路径）
fn bench_shared_resolution(c: &mut Criterion) {
    let container = Container::new();
    container
        .singleton("simple", Concrete::from_fn(|| SimpleService { value: 1 }))
        .unwrap();
    container.make::<SimpleService>("simple").unwrap();

    c.bench_function("shared_resolution", |b| {
        b.iter(|| black_box(container.make::<SimpleService>("simple").unwrap()))
    });
}

/// 基准测试：瞬态服务解析（每次构建）
fn bench_transient_resolution(c: &mut Criterion) {
    let container = Container::new();
    container
        .bind(
            "simple",
            Concrete::factory(|_, params| {
                let value = params.get::<i32>(0).map(|v| *v).unwrap_or(0);
                Ok(SimpleService { value })
            }),
            false,
        )
        .unwrap();

    c.bench_function("transient_resolution", |b| {
        b.iter(|| {
            black_box(
                container
                    .make_with::<SimpleService>("simple", Parameters::new().with(7_i32))
                    .unwrap(),
            )
        })
    });
}

/// 基准测试：别名链长度对解析的影响
fn bench_alias_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("alias_chain");

    for depth in [1usize, 4, 16, 64].iter() {
        let container = Container::new();
        container.instance("alias_0", SimpleService { value: 0 });
        for i in 1..=*depth {
            container.alias(format!("alias_{}", i - 1), format!("alias_{}", i));
        }
        let leaf = format!("alias_{}", depth);

        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| black_box(container.make::<SimpleService>(leaf.clone()).unwrap()))
        });
    }

    group.finish();
}

/// 基准测试：扩展器数量对构建的影响
fn bench_extenders(c: &mut Criterion) {
    let mut group = c.benchmark_group("extenders");

    for count in [0usize, 1, 8, 32].iter() {
        let container = Container::new();
        container
            .bind("simple", Concrete::from_fn(|| SimpleService { value: 0 }), false)
            .unwrap();
        for _ in 0..*count {
            container
                .extend("simple", |s: Arc<SimpleService>, _| {
                    Ok(SimpleService { value: s.value + 1 })
                })
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| black_box(container.make::<SimpleService>("simple").unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_shared_resolution,
    bench_transient_resolution,
    bench_alias_chain,
    bench_extenders
);
criterion_main!(benches);
