//! Benchmarks for capability dispatch and root lifecycle

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fiber_core::prelude::*;

#[derive(Default)]
struct Counter {
    ticks: u64,
}

impl Tick for Counter {
    fn on_tick(&mut self) {
        self.ticks += 1;
    }
}

impl PointerDown for Counter {
    fn on_pointer_down(&mut self) {
        self.ticks += 10;
    }
}

impl Component for Counter {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.tick().pointer_down()
    }
}

impl Controller for Counter {
    type Model = NoModel;
    type View = NoView;
}

/// A context with `n` live counters
fn populated(n: usize) -> (Fiber, Vec<CompositionRoot>) {
    let fiber = Fiber::new(SceneGraph::default());
    fiber.define(ControllerType::new::<Counter>());
    let roots = (0..n)
        .map(|i| {
            let root = CompositionRoot::new(&fiber, fiber.spawn(&format!("counter-{i}")));
            root.construct::<Counter>().unwrap();
            root
        })
        .collect();
    (fiber, roots)
}

fn bench_tick_pump(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_pump");

    for n in [1, 100, 1000] {
        let (fiber, _roots) = populated(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(fiber.tick()))
        });
    }

    group.finish();
}

fn bench_node_delivery(c: &mut Criterion) {
    let (fiber, roots) = populated(1000);
    let node = roots[500].node();

    c.bench_function("deliver_one_node_of_1000", |b| {
        b.iter(|| black_box(fiber.deliver(black_box(node), &Event::PointerDown)))
    });
}

fn bench_construct_reset(c: &mut Criterion) {
    let (fiber, _roots) = populated(100);
    let root = CompositionRoot::new(&fiber, fiber.spawn("churn"));

    c.bench_function("construct_then_reset", |b| {
        b.iter(|| {
            root.construct::<Counter>().unwrap();
            root.reset().unwrap();
        })
    });
}

fn bench_get_all(c: &mut Criterion) {
    let (fiber, _roots) = populated(1000);

    c.bench_function("get_all_1000", |b| {
        b.iter(|| black_box(fiber.get_all::<Counter>()))
    });
}

criterion_group!(
    benches,
    bench_tick_pump,
    bench_node_delivery,
    bench_construct_reset,
    bench_get_all
);
criterion_main!(benches);
