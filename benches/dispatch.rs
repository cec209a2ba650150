//! Dispatch benchmarks: table construction and GET/GETNEXT resolution.
//!
//! Commands are answered by a canned runner, so the numbers measure the
//! agent's own work rather than process spawning.

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use extsnmpd::extensible::{
    CommandKind, CommandLine, CommandOutput, CommandRunner, ExecSettings, ExtensibleSchemas,
    Registry,
};
use extsnmpd::mib::{BoxFuture, SubtreeTable, SystemGroup, SystemSettings, match_instance};
use extsnmpd::mib::{InstanceBound, MatchMode};
use extsnmpd::oid::Oid;
use tokio::runtime::Runtime;

struct Canned;

impl CommandRunner for Canned {
    fn run<'a>(&'a self, _command: &'a CommandLine, _deadline: Duration) -> BoxFuture<'a, CommandOutput> {
        Box::pin(async { CommandOutput::new(0, "ok\n") })
    }
}

fn registry(entries: u32) -> Arc<Registry> {
    let mut registry = Registry::new();
    for n in 0..entries {
        registry.register(CommandKind::Exec, None, format!("check{n}"), "/bin/true");
        let oid = Oid::from_slice(&[1, 3, 6, 1, 4, 1, 2021, 100 + n]);
        registry.register(CommandKind::Shell, Some(oid), format!("general{n}"), "true");
    }
    Arc::new(registry)
}

fn parts(entries: u32) -> (SystemGroup, ExtensibleSchemas, Arc<Registry>) {
    let registry = registry(entries);
    let runner: Arc<dyn CommandRunner> = Arc::new(Canned);
    let schemas = ExtensibleSchemas::new(registry.clone(), runner, ExecSettings::default());
    (SystemGroup::new(&SystemSettings::default()), schemas, registry)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_build");
    for entries in [0u32, 16, 256] {
        let (system, schemas, registry) = parts(entries);
        let statics = [system.subtree(), schemas.table_subtree()];
        group.bench_with_input(BenchmarkId::from_parameter(entries), &entries, |b, _| {
            b.iter(|| black_box(SubtreeTable::build(&statics, &registry, &schemas)))
        });
    }
    group.finish();
}

fn bench_match(c: &mut Criterion) {
    let column = Oid::from_slice(&[1, 3, 6, 1, 4, 1, 2021, 8, 1, 101]);
    let request = column.child(7);
    c.bench_function("match_instance/next", |b| {
        b.iter(|| {
            black_box(match_instance(
                &column,
                &request,
                MatchMode::Next,
                InstanceBound::Limit(64),
            ))
        })
    });
}

fn bench_resolve(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let (system, schemas, registry) = parts(64);
    let table =
        SubtreeTable::build(&[system.subtree(), schemas.table_subtree()], &registry, &schemas)
            .unwrap();

    let sys_descr = Oid::from_slice(&[1, 3, 6, 1, 2, 1, 1, 1, 0]);
    let ext_name = Oid::from_slice(&[1, 3, 6, 1, 4, 1, 2021, 8, 1, 2, 32]);
    let general = Oid::from_slice(&[1, 3, 6, 1, 4, 1, 2021, 150, 2, 1]);

    let mut group = c.benchmark_group("resolve");
    group.bench_function("get/system", |b| {
        b.iter(|| runtime.block_on(table.get(black_box(&sys_descr))))
    });
    group.bench_function("get/ext_table", |b| {
        b.iter(|| runtime.block_on(table.get(black_box(&ext_name))))
    });
    group.bench_function("get_next/general", |b| {
        b.iter(|| runtime.block_on(table.get_next(black_box(&general))))
    });
    group.bench_function("walk/all", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut cursor = Oid::empty();
                let mut visited = 0usize;
                while let Some(found) = table.get_next(&cursor).await.found() {
                    cursor = found.oid;
                    visited += 1;
                }
                visited
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_match, bench_resolve);
criterion_main!(benches);
