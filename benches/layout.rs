use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use regnet_layout::{
    CancelToken, GraphModel, HaloParams, LayoutOptions, LayoutStrategy, NodeKind, compute_layout,
};
use std::hint::black_box;

fn chain_graph(nodes: usize) -> GraphModel {
    let mut model = GraphModel::new();
    for i in 0..nodes {
        model.ensure_node(&format!("n{i:05}"), NodeKind::Gene);
    }
    for i in 0..nodes.saturating_sub(1) {
        model.add_link(
            &format!("e{i:05}"),
            &format!("n{i:05}"),
            &format!("n{:05}", i + 1),
        );
    }
    model
}

fn dense_graph(nodes: usize, extra_edges: usize) -> GraphModel {
    let mut model = chain_graph(nodes);
    let mut count = 0usize;
    'outer: for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_edges {
                break 'outer;
            }
            model.add_link(
                &format!("x{i:05}-{j:05}"),
                &format!("n{i:05}"),
                &format!("n{j:05}"),
            );
            count += 1;
        }
    }
    model
}

fn bench_layered(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered");
    for &size in &[50usize, 200, 800] {
        let model = dense_graph(size, size * 2);
        let strategy = LayoutStrategy::Layered(LayoutOptions::default());
        group.bench_with_input(BenchmarkId::from_parameter(size), &model, |b, model| {
            b.iter(|| {
                let result =
                    compute_layout(black_box(model), &strategy, &CancelToken::new()).unwrap();
                black_box(result.goodness)
            })
        });
    }
    group.finish();
}

fn bench_router_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_passes");
    let model = dense_graph(120, 240);
    for &passes in &[0usize, 4, 12] {
        let strategy = LayoutStrategy::Layered(LayoutOptions {
            optimization_passes: passes,
            ..LayoutOptions::default()
        });
        group.bench_with_input(
            BenchmarkId::from_parameter(passes),
            &strategy,
            |b, strategy| {
                b.iter(|| {
                    let result =
                        compute_layout(black_box(&model), strategy, &CancelToken::new()).unwrap();
                    black_box(result.routes.len())
                })
            },
        );
    }
    group.finish();
}

fn bench_halo(c: &mut Criterion) {
    let model = dense_graph(300, 300);
    let strategy = LayoutStrategy::Halo(HaloParams {
        core: vec!["n00000".to_string()],
        ..HaloParams::default()
    });
    c.bench_function("halo_300", |b| {
        b.iter(|| {
            let result =
                compute_layout(black_box(&model), &strategy, &CancelToken::new()).unwrap();
            black_box(result.placements.len())
        })
    });
}

criterion_group!(benches, bench_layered, bench_router_passes, bench_halo);
criterion_main!(benches);
