//! 端到端：证据打分 -> 生成记录 -> 编码入 Box -> 解码 -> 声誉聚合

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use skillproof_core::{
    codec,
    reputation::Trend,
    store::RecordStore,
    CredibilityLevel, DecodeError, ReputationEngine, ScoringEngine,
};

#[test]
fn test_score_store_aggregate_pipeline() {
    let scoring = ScoringEngine::default();
    let reputation = ReputationEngine::default();
    let store = RecordStore::temporary().unwrap();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

    let repo = json!({
        "full_name": "alice/ledger-tools",
        "languages": {"Python": 42000, "Solidity": 9000},
        "contributors": [{"login": "alice", "contributions": 180}, {"login": "bob", "contributions": 40}],
        "community": {"stars": 120, "forks": 30, "watchers": 120},
        "tree": [
            {"path": "README.md", "type": "blob", "sha": "a1"},
            {"path": "LICENSE", "type": "blob", "sha": "a2"},
            {"path": ".gitignore", "type": "blob", "sha": "a3"},
            {"path": ".github", "type": "tree", "sha": "a4"},
            {"path": "tests", "type": "tree", "sha": "a5"},
            {"path": "contracts", "type": "tree", "sha": "a6"},
            {"path": "pyproject.toml", "type": "blob", "sha": "a7"}
        ],
        "topics": ["algorand", "web3"],
        "created_at": "2022-03-01T00:00:00Z",
        "pushed_at": "2025-05-30T00:00:00Z"
    });

    // 同一份证据在三个不同时间点提交
    for days_ago in [120, 60, 2] {
        let at = now - Duration::days(days_ago);
        let result = scoring.score_raw("repo", repo.clone(), at).unwrap();
        assert!(result.verified);
        assert_eq!(result.domain, "python");
        assert_eq!(result.subdomain.as_deref(), Some("blockchain"));

        let record = result.to_record("ai-graded", at.timestamp() as u64).unwrap();
        store.append("WALLET", &record).unwrap();
    }

    let blob = store.raw("WALLET").unwrap();
    let records = codec::decode(&blob).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert!(records.iter().all(|r| r.domain == "python:blockchain"));
    // 同一证据 -> 同一指纹
    assert!(records.windows(2).all(|w| w[0].artifact_hash == w[1].artifact_hash));

    let profile = reputation.aggregate_blob("WALLET", &blob, now).unwrap();
    assert_eq!(profile.total_records, 3);
    assert_eq!(profile.distinct_domains, 1);
    assert_eq!(profile.top_domain.as_deref(), Some("python"));
    assert_eq!(profile.active_since, Some(records[0].timestamp));
    assert!(profile.verification_badge);
    assert!(profile.credibility_level >= CredibilityLevel::Moderate);
    assert!((0.0..=1.0).contains(&profile.trust_index));
    assert_ne!(profile.domain_scores[0].trend, Trend::Declining);
}

#[test]
fn test_tampered_box_is_never_partially_scored() {
    let store = RecordStore::temporary().unwrap();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let result = ScoringEngine::default()
        .score_raw(
            "project",
            json!({"name": "p", "files": [{"path": "main.go", "bytes": "7061636b616765206d61696e"}]}),
            now,
        )
        .unwrap();
    assert_eq!(result.domain, "go");

    let record = result.to_record("ai-graded", now.timestamp() as u64).unwrap();
    store.append("W", &record).unwrap();
    store.append("W", &record).unwrap();

    let mut blob = store.raw("W").unwrap();
    blob.truncate(blob.len() - 10);
    assert!(matches!(
        ReputationEngine::default().aggregate_blob("W", &blob, now),
        Err(DecodeError::TruncatedRecord { .. })
    ));
}
