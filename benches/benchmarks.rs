//! Performance benchmarks for kira-scenario.
//!
//! This module contains benchmarks for:
//! - Template interpolation over growing parameter maps
//! - Dot-path lookup on generic and typed step outputs
//! - Playbook loading and validation
//!
//! Run with: `cargo bench`

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kira_scenario::chain::TxResponse;
use kira_scenario::scenario::{load_playbook_str, Value, VariableStore};
use serde_json::json;

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    /// A store with scalar defaults, a query result and a typed tx output.
    pub fn populated_store() -> VariableStore {
        let mut store = VariableStore::new();
        store.set("sender", "alice");
        store.set("amount", 100);
        store.set(
            "balances",
            json!({
                "balances": [
                    {"denom": "ukex", "amount": "1000"},
                    {"denom": "test", "amount": "5"},
                ],
                "pagination": {"total": "2"},
            }),
        );
        store.set(
            "tx1",
            Value::typed(TxResponse {
                tx_hash: "7F3A9C".to_string(),
                height: 1234,
                gas_wanted: 200_000,
                gas_used: 81_220,
                ..Default::default()
            }),
        );
        store
    }

    /// Parameter maps that mix literals and templates.
    pub fn params(count: usize) -> BTreeMap<String, String> {
        let templates = [
            "{{ sender }}",
            "{{ amount }}ukex",
            "{{ balances.balances.0.amount }}",
            "{{ tx1.tx_hash }}",
            "literal-value",
            "memo {{ tx1.height }} of {{ sender }}",
        ];

        (0..count).map(|i| (format!("p{i}"), templates[i % templates.len()].to_string())).collect()
    }

    /// A playbook document with `steps` steps.
    pub fn playbook(steps: usize) -> String {
        let mut doc = String::from("name: bench\nvariables:\n  sender: alice\n  amount: 100ukex\nsteps:\n");
        for i in 0..steps {
            doc.push_str(&format!(
                "  - name: step{i}\n    module: bank\n    action: send\n    params:\n      from: \"{{{{ sender }}}}\"\n      to: kira1recipient{i}\n      amount: \"{{{{ amount }}}}\"\n    output: out{i}\n    tx_options:\n      fees: 100ukex\n      broadcast_mode: async\n      wait_timeout: 30s\n"
            ));
        }
        doc
    }
}

// ============================================================================
// Variable Store Benchmarks
// ============================================================================

fn bench_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("variables/interpolate_params");
    let store = fixtures::populated_store();

    for count in [6, 60, 600] {
        let params = fixtures::params(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &params, |b, params| {
            b.iter(|| store.interpolate_params(black_box(params)));
        });
    }

    group.finish();
}

fn bench_dot_path_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("variables/get");
    let store = fixtures::populated_store();

    for path in ["sender", "balances.balances.1.denom", "tx1.tx_hash", "tx1.missing"] {
        group.bench_with_input(BenchmarkId::from_parameter(path), path, |b, path| {
            b.iter(|| store.get_string(black_box(path)));
        });
    }

    group.finish();
}

// ============================================================================
// Loader Benchmarks
// ============================================================================

fn bench_playbook_loading(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser/load_playbook_str");

    for steps in [1, 10, 100] {
        let doc = fixtures::playbook(steps);
        group.throughput(Throughput::Elements(steps as u64));
        group.bench_with_input(BenchmarkId::from_parameter(steps), &doc, |b, doc| {
            b.iter(|| load_playbook_str(black_box(doc)));
        });
    }

    group.finish();
}

criterion_group!(variable_benches, bench_interpolation, bench_dot_path_lookup,);

criterion_group!(parsing_benches, bench_playbook_loading,);

criterion_main!(variable_benches, parsing_benches,);
