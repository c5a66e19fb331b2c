use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use islet_core::hydrate::{
    hydrate, register_setup, ComponentDescriptor, DescriptorSet, Element, Embed, COMPONENT_ATTR,
    EMBED_ATTR,
};
use islet_core::reactive::{Computed, Effect, Signal};

fn signal_write_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_write");

    for fanout in [1usize, 8, 64] {
        let signal = Signal::new(0i64);
        let sink = Arc::new(AtomicI64::new(0));
        let effects: Vec<Effect> = (0..fanout)
            .map(|_| {
                let signal = signal.clone();
                let sink = sink.clone();
                Effect::new(move || {
                    sink.fetch_add(signal.get(), Ordering::Relaxed);
                })
            })
            .collect();

        let mut next = 0i64;
        group.bench_function(format!("fanout_{fanout}"), |b| {
            b.iter(|| {
                next += 1;
                signal.set(black_box(next)).unwrap();
            })
        });

        drop(effects);
    }

    group.finish();
}

fn computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");

    for depth in [4usize, 16] {
        let base = Signal::new(0i64);
        let mut chain = Vec::with_capacity(depth);
        {
            let base = base.clone();
            chain.push(Computed::new(move || base.get() + 1));
        }
        for _ in 1..depth {
            let prev = chain.last().cloned().unwrap();
            chain.push(Computed::new(move || prev.get().unwrap_or_default() + 1));
        }

        let tail = chain.last().cloned().unwrap();
        let sink = Arc::new(AtomicI64::new(0));
        let sink_clone = sink.clone();
        let _effect = Effect::try_new(move || {
            sink_clone.store(tail.get()?, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();

        let mut next = 0i64;
        group.bench_function(format!("depth_{depth}"), |b| {
            b.iter(|| {
                next += 1;
                base.set(black_box(next)).unwrap();
            })
        });
    }

    group.finish();
}

fn hydrate_counter_island(c: &mut Criterion) {
    register_setup("bench/counter", |component| {
        component.set_embeds(vec![Embed::Signal(Signal::new(Value::from(0)))]);
        Ok(())
    });

    let mut descriptors = DescriptorSet::new();
    descriptors.insert(
        "counter",
        ComponentDescriptor {
            name: "bench:counter".into(),
            url: Some("bench/counter".into()),
            args: Map::new(),
            refs: std::collections::HashMap::new(),
        },
    );

    c.bench_function("hydrate_counter_island", |b| {
        b.iter_batched(
            || {
                let root = Element::new("section").with_attr(COMPONENT_ATTR, "counter");
                let label = Element::new("span").with_attr(EMBED_ATTR, "0-text");
                root.append_child(&label);
                root
            },
            |root| hydrate(&root, &descriptors, Map::new()).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    signal_write_fanout,
    computed_chain,
    hydrate_counter_island
);
criterion_main!(benches);
