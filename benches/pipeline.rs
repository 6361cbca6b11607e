//! Benchmarks for rewrite passes.
//!
//! Measures a full pass (decode, all handlers, encode) over a synthetic module whose
//! methods mix rewritable field accesses, broken references and plain arithmetic, and
//! compares sequential against parallel processing of a batch of such modules.

extern crate dotshim;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use dotshim::prelude::*;
use std::hint::black_box;

const METHODS: usize = 64;
const BATCH: usize = 32;

fn host() -> HostCatalog {
    HostCatalog::builder()
        .with_type(
            "StardewValley",
            HostType::new("StardewValley.Farmer")
                .property("Name", "System.String", false)
                .field("money", "System.Int32"),
        )
        .build()
}

/// Builds a module with `METHODS` methods of roughly 40 instructions each.
fn create_module(name: &str) -> BinaryModule {
    let farmer = TypeRef::new("StardewValley", "StardewValley.Farmer");
    let mut references = ReferenceTable::new();
    let name_field = references
        .intern_member(&MemberRef::field(farmer.clone(), "Name", "System.String"))
        .unwrap();
    let money = references
        .intern_member(&MemberRef::field(farmer.clone(), "money", "System.Int32"))
        .unwrap();
    let removed = references
        .intern_member(&MemberRef::field(farmer, "removed", "System.Int32"))
        .unwrap();
    let write_line = references
        .intern_member(&MemberRef::new(
            TypeRef::new("mscorlib", "System.Console"),
            "WriteLine",
            Signature::static_method(VOID_TYPE, &["System.String"]),
        ))
        .unwrap();

    let mut code = Vec::new();
    for _ in 0..4 {
        // ldarg.0; ldfld Name; call WriteLine
        code.push(0x02);
        code.push(0x7B);
        code.extend_from_slice(&name_field.value().to_le_bytes());
        code.push(0x28);
        code.extend_from_slice(&write_line.value().to_le_bytes());
        // ldarg.0; ldfld money; ldc.i4.1; add; pop
        code.push(0x02);
        code.push(0x7B);
        code.extend_from_slice(&money.value().to_le_bytes());
        code.extend_from_slice(&[0x17, 0x58, 0x26]);
        // ldarg.0; ldfld removed; pop
        code.push(0x02);
        code.push(0x7B);
        code.extend_from_slice(&removed.value().to_le_bytes());
        code.push(0x26);
    }
    code.push(0x2A);

    let mut module = BinaryModule::new(name, ModuleHeader::any_cpu(), references);
    for index in 0..METHODS {
        module.add_method(MethodDef::new(
            "BenchMod.ModEntry",
            format!("Method{index}"),
            code.clone(),
        ));
    }
    module
}

fn bench_single_pass(c: &mut Criterion) {
    let pipeline = PipelineBuilder::new(PipelineConfig::new().with_host(host()).with_paranoid(true))
        .build()
        .unwrap();
    let module = create_module("BenchMod");
    let code_size: usize = module.methods().iter().map(|m| m.code.len()).sum();

    let mut group = c.benchmark_group("rewrite_pass");
    group.throughput(Throughput::Bytes(code_size as u64));
    group.bench_function("rewrite", |b| {
        b.iter_batched(
            || module.clone(),
            |mut module| {
                let report = pipeline.rewrite(black_box(&mut module)).unwrap();
                black_box(report)
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("detect_only", |b| {
        let detect = PipelineBuilder::new(PipelineConfig::detect_only().with_host(host()))
            .build()
            .unwrap();
        b.iter_batched(
            || module.clone(),
            |mut module| {
                let report = detect.rewrite(black_box(&mut module)).unwrap();
                black_box(report)
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let pipeline = PipelineBuilder::new(PipelineConfig::new().with_host(host()))
        .build()
        .unwrap();
    let modules: Vec<BinaryModule> = (0..BATCH)
        .map(|i| create_module(&format!("BenchMod{i}")))
        .collect();

    let mut group = c.benchmark_group("rewrite_batch");
    group.bench_function("sequential", |b| {
        b.iter_batched(
            || modules.clone(),
            |mut modules| {
                for module in &mut modules {
                    black_box(pipeline.rewrite(module).unwrap());
                }
            },
            BatchSize::LargeInput,
        );
    });
    group.bench_function("parallel", |b| {
        b.iter_batched(
            || modules.clone(),
            |mut modules| black_box(pipeline.rewrite_all(&mut modules)),
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_single_pass, bench_batch);
criterion_main!(benches);
