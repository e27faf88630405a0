use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skillproof_core::{
    codec,
    evidence::{Evidence, ProjectEvidence, ProjectFile},
    ReputationEngine, ScoringEngine, SkillRecord,
};

const HASH: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
const DOMAINS: [&str; 5] = ["python", "rust", "solidity:defi", "go", "javascript:web"];

/// 模拟一个写满了的钱包 (约 280 条记录)
fn sample_records(n: u64) -> Vec<SkillRecord> {
    (0..n)
        .map(|i| {
            SkillRecord::new(
                "ai-graded",
                DOMAINS[(i % 5) as usize],
                (i * 37) % 101,
                HASH,
                1_700_000_000 + i * 3_600,
            )
            .unwrap()
        })
        .collect()
}

fn bench_codec(c: &mut Criterion) {
    let records = sample_records(280);
    let blob = codec::encode_all(&records).unwrap();

    c.bench_function("codec_encode_wallet", |b| {
        b.iter(|| codec::encode_all(black_box(&records)).unwrap())
    });
    c.bench_function("codec_decode_wallet", |b| {
        b.iter(|| codec::decode(black_box(&blob)).unwrap())
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let records = sample_records(280);
    let engine = ReputationEngine::default();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

    c.bench_function("reputation_aggregate", |b| {
        b.iter(|| engine.aggregate("bench-wallet", black_box(&records), now))
    });
}

fn bench_scoring(c: &mut Criterion) {
    let files = (0..200)
        .map(|i| ProjectFile {
            path: format!("src/module_{}/file_{}.rs", i % 12, i),
            bytes: vec![b'x'; 2_048],
        })
        .collect();
    let evidence = Evidence::Project(ProjectEvidence {
        name: "bench".to_string(),
        declared_domain: None,
        files,
    });
    let engine = ScoringEngine::default();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

    c.bench_function("score_project_archive", |b| {
        b.iter(|| engine.score(black_box(&evidence), now).unwrap())
    });
}

criterion_group!(benches, bench_codec, bench_aggregate, bench_scoring);
criterion_main!(benches);
