// Benchmarks for parsing, kernel generation, and matrix emission.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rkc::codegen;
use rkc::matrix::{self, FillCategory};
use rkc::parser;
use rkc::registry::{KernelArg, KernelSpec, Registry, TypeDesc};

fn arg(name: &str, ty: &str) -> KernelArg {
    KernelArg {
        name: name.to_string(),
        ty: TypeDesc::parse(ty),
    }
}

fn sample_spec() -> KernelSpec {
    KernelSpec {
        name: "ragged_union_fillna".to_string(),
        args: vec![
            arg("toindex", "List[int64_t]"),
            arg("fromindex", "const List[int64_t]"),
            arg("length", "int64_t"),
        ],
        outparams: vec!["toindex".to_string()],
        definition: concat!(
            "def ragged_union_fillna(toindex, fromindex, length):\n",
            "    for i in range(length):\n",
            "        toindex[i] = fromindex[i] if fromindex[i] >= 0 else -1\n"
        )
        .to_string(),
        specializations: Vec::new(),
    }
}

fn sample_registry() -> Registry {
    let specs = rkc::registry::ELIGIBLE
        .iter()
        .map(|name| {
            let mut spec = sample_spec();
            spec.name = name.to_string();
            spec
        })
        .collect();
    Registry::from_specs(specs).expect("valid specs")
}

fn bench_parse(c: &mut Criterion) {
    let definition = sample_spec().definition;
    c.bench_function("parse_definition", |b| {
        b.iter(|| parser::parse(black_box(&definition)))
    });
}

fn bench_single_kernel(c: &mut Criterion) {
    let spec = sample_spec();
    c.bench_function("generate_single_kernel", |b| {
        b.iter(|| codegen::generate_kernel(black_box(&spec)).unwrap())
    });
}

fn bench_full_registry(c: &mut Criterion) {
    let registry = sample_registry();
    c.bench_function("generate_full_registry", |b| {
        b.iter(|| codegen::generate(black_box(&registry), None).unwrap())
    });
}

fn bench_matrix(c: &mut Criterion) {
    c.bench_function("matrix_dispatch_169", |b| {
        b.iter(|| matrix::emit(black_box(FillCategory::Dispatch)))
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_single_kernel,
    bench_full_registry,
    bench_matrix
);
criterion_main!(benches);
