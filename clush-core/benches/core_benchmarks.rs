use std::collections::BTreeMap;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use clush_core::fuzzy::resolve;
use clush_core::{Context, LevelRegistrar, LevelType, Member, Outcome, OutputBuffer, Result};

fn noop(_: &mut Context, _: &[String]) -> Result<Outcome> {
    Ok(Outcome::success())
}

fn command_names() -> BTreeMap<String, usize> {
    [
        "status", "start", "stop", "restart", "promote", "demote", "manage", "unmanage",
        "migrate", "unmigrate", "cleanup", "refresh", "reprobe", "failcount", "meta", "param",
        "secret", "utilization", "trace", "untrace", "maintenance", "operations", "constraints",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| (name.to_string(), i))
    .collect()
}

fn bench_resolver(c: &mut Criterion) {
    let names = command_names();

    c.bench_function("resolve_exact", |b| {
        b.iter(|| resolve(black_box(&names), black_box("migrate")))
    });

    c.bench_function("resolve_unique_prefix", |b| {
        b.iter(|| resolve(black_box(&names), black_box("utili")))
    });

    c.bench_function("resolve_subsequence", |b| {
        b.iter(|| resolve(black_box(&names), black_box("mtnc")))
    });

    c.bench_function("resolve_ambiguous", |b| {
        b.iter(|| resolve(black_box(&names), black_box("re")))
    });
}

fn resource_members() -> Vec<Member> {
    command_names()
        .into_keys()
        .map(|name| Member::command("do_generated", noop).name(name).arg("rsc"))
        .collect()
}

fn root_members() -> Vec<Member> {
    vec![Member::level("do_resource", RESOURCE)]
}

const RESOURCE: LevelType = LevelType::stateless("resource", resource_members);
const ROOT: LevelType = LevelType::stateless("root", root_members);

fn bench_registry(c: &mut Criterion) {
    c.bench_function("registry_build_tree", |b| {
        b.iter(|| {
            let mut registrar = LevelRegistrar::new();
            registrar.build(black_box(ROOT)).map(|r| r.len())
        })
    });

    c.bench_function("registry_build_cached", |b| {
        let mut registrar = LevelRegistrar::new();
        let _ = registrar.build(ROOT);
        b.iter(|| registrar.build(black_box(ROOT)).map(|r| r.len()))
    });
}

fn bench_navigation(c: &mut Criterion) {
    c.bench_function("jump_path_round_trip", |b| {
        let mut ctx = Context::builder(ROOT)
            .output(OutputBuffer::new())
            .build()
            .expect("registry builds");
        b.iter(|| {
            let _ = ctx.jump_path(black_box("resource/../resource"));
            let _ = ctx.up();
        })
    });

    c.bench_function("complete_arguments", |b| {
        let ctx = Context::builder(ROOT)
            .output(OutputBuffer::new())
            .build()
            .expect("registry builds");
        let tokens: Vec<String> = ["resource", "mig"].iter().map(|s| s.to_string()).collect();
        b.iter(|| clush_core::complete(&ctx, black_box(&tokens)))
    });
}

criterion_group!(benches, bench_resolver, bench_registry, bench_navigation);
criterion_main!(benches);
