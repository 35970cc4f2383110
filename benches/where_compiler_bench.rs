use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::hint::black_box;

use nocodb_connector::params::{normalize_filter_groups, FilterGroupsParam};
use nocodb_connector::where_compiler::{build_where, map_operator_and_value};

// 三档复杂度的过滤组输入
fn test_cases() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        (
            "simple",
            json!([{"conditions": [{"field": "status", "operator": "eq", "value": "Open"}]}]),
        ),
        (
            "medium",
            json!([{
                "logic": "and",
                "conditions": [
                    {"field": "status", "operator": "anyof", "value": "Open,InProgress"},
                    {"field": "priority", "operator": "gt", "value": "2"},
                    {"field": "assignee", "operator": "isnot", "value": "nobody"}
                ]
            }]),
        ),
        (
            "complex",
            json!({"groups": [
                {
                    "logic": "and",
                    "conditions": [
                        {"field": "title", "operator": "contains", "value": "Release Plan"},
                        {"field": "dueDate", "operator": "btw", "value": "2024-01-01,2024-12-31"},
                        {"field": "assignee", "operator": "isnot", "value": "nobody"}
                    ]
                },
                {
                    "logic": "or",
                    "conditions": {"condition": [
                        {"condition": {"field": "status", "operator": "eq", "value": "Done"}},
                        {"field": "archived", "operator": "is", "value": ""}
                    ]}
                }
            ]}),
        ),
    ]
}

// 基准测试：操作符映射性能
fn benchmark_operator_mapper(c: &mut Criterion) {
    let operators = [
        ("contains", json!("abc")),
        ("anyof", json!("a,b,c,d,e")),
        ("btw", json!("1,100")),
        ("unknown_op", json!("x")),
    ];

    let mut group = c.benchmark_group("operator_mapper_performance");

    for (op, value) in operators {
        group.bench_with_input(BenchmarkId::new("map", op), &(op, value), |b, (op, value)| {
            b.iter(|| black_box(map_operator_and_value(black_box(op), Some(black_box(value)))))
        });
    }

    group.finish();
}

// 基准测试：过滤组归一化性能
fn benchmark_normalizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalizer_performance");

    for (name, raw) in test_cases() {
        group.bench_with_input(BenchmarkId::new("normalize", name), &raw, |b, raw| {
            b.iter(|| {
                let param: FilterGroupsParam =
                    serde_json::from_value(black_box(raw.clone())).expect("参数应该可解析");
                black_box(normalize_filter_groups(Some(&param)))
            })
        });
    }

    group.finish();
}

// 基准测试：where 子句编译性能
fn benchmark_where_compiler(c: &mut Criterion) {
    let mut group = c.benchmark_group("where_compiler_performance");

    for (name, raw) in test_cases() {
        // 预先归一化
        let param: FilterGroupsParam = serde_json::from_value(raw).expect("参数应该可解析");
        let groups = normalize_filter_groups(Some(&param));

        group.bench_with_input(BenchmarkId::new("compile", name), &groups, |b, groups| {
            b.iter(|| black_box(build_where(black_box(groups))))
        });
    }

    group.finish();
}

// 基准测试：完整的端到端处理
fn benchmark_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end_performance");

    for (name, raw) in test_cases() {
        group.bench_with_input(BenchmarkId::new("full_pipeline", name), &raw, |b, raw| {
            b.iter(|| {
                // 完整的处理流程：反序列化 -> 归一化 -> 编译
                let param: FilterGroupsParam =
                    serde_json::from_value(black_box(raw.clone())).expect("参数应该可解析");
                let groups = normalize_filter_groups(Some(&param));
                black_box(build_where(&groups))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_operator_mapper,
    benchmark_normalizer,
    benchmark_where_compiler,
    benchmark_end_to_end
);
criterion_main!(benches);
