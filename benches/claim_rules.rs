//! Claim rule engine benchmark.
//!
//! Measures the per-call cost of evaluating a typical rule set against a
//! decoded claim mapping, excluding parsing and signature verification.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use oidc_verify::{audience, contains_all, exact_match, verify, ClaimMap, ClaimRule};
use serde_json::json;

fn claim_map() -> ClaimMap {
    json!({
        "iss": "https://issuer.example",
        "aud": "api.example.com",
        "sub": "user-123",
        "exp": 4_102_444_800i64,
        "roles": ["reader", "writer", "admin"],
    })
    .as_object()
    .expect("object literal")
    .clone()
}

fn rule_set() -> Vec<ClaimRule> {
    vec![
        exact_match("iss", "https://issuer.example".to_string()),
        audience("api.example.com"),
        exact_match("sub", "user-123".to_string()),
        contains_all("roles", ["reader".to_string(), "admin".to_string()]),
        ClaimRule::present("exp"),
    ]
}

fn bench_verify(c: &mut Criterion) {
    let claims = claim_map();
    let rules = rule_set();

    c.bench_function("verify/five_rules_pass", |b| {
        b.iter(|| verify(black_box(&claims), black_box(&rules)))
    });

    let failing = vec![
        audience("other-api"),
        contains_all("roles", ["admin".to_string(), "missing".to_string()]),
    ];

    c.bench_function("verify/two_rules_fail_aggregated", |b| {
        b.iter(|| verify(black_box(&claims), black_box(&failing)).unwrap_err())
    });
}

criterion_group!(benches, bench_verify);
criterion_main!(benches);
