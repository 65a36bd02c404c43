use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use strata_core::{
    collapse, traverse, GraphNode, Key, KeySet, MetaMode, Path, PathMeta, PathSet, Range,
};

const USERS: i64 = 500;

fn bench_graph() -> GraphNode {
    let mut graph = GraphNode::empty();
    for id in 0..USERS {
        let user = vec![Key::name("usersById"), Key::Integer(id)];
        let mut name = user.clone();
        name.push(Key::name("name"));
        graph.set_path(&name, GraphNode::atom(format!("user-{id}")));
        // Every third user is missing an age.
        if id % 3 != 0 {
            let mut age = user;
            age.push(Key::name("age"));
            graph.set_path(&age, GraphNode::atom(id % 90));
        }
    }
    graph
}

fn bench_request() -> Vec<PathSet> {
    vec![PathSet::new(vec![
        KeySet::Key(Key::name("usersById")),
        KeySet::Range(Range::new(0, USERS - 1)),
        KeySet::list(["name", "age"]),
    ])]
}

fn bench_traverse(c: &mut Criterion) {
    let graph = bench_graph();
    let request = bench_request();

    c.bench_function("traverse/range_of_fields", |b| {
        b.iter(|| {
            let found = traverse(black_box(&request), &graph)
                .filter(|(_, node)| node.is_some())
                .count();
            black_box(found);
        });
    });

    c.bench_function("traverse/path_meta", |b| {
        b.iter(|| {
            let meta = PathMeta::build(black_box(&request), &graph, MetaMode::Full);
            black_box(meta.unhandled.len());
        });
    });
}

fn bench_collapse(c: &mut Criterion) {
    let graph = bench_graph();
    let missing: Vec<Path> = PathMeta::build(&bench_request(), &graph, MetaMode::Full).unhandled;

    c.bench_function("collapse/missing_fields", |b| {
        b.iter(|| {
            let sets = collapse(black_box(&missing));
            black_box(sets.len());
        });
    });
}

criterion_group!(benches, bench_traverse, bench_collapse);
criterion_main!(benches);
