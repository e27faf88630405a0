//! 证据打分引擎 (Evidence Scoring Engine)
//!
//! **流程**:
//! 1. 按证据种类选出固定权重表 (每张表权重和为 1.0)。
//! 2. 逐个运行评估器；元数据完全缺失的评估器被跳过。
//! 3. `overall_score = Σ weighted_score / Σ weight(已运行)`，缺失的信号不会压低上限。
//! 4. `confidence = 已运行评估器数 / 该种类评估器总数`。
//! 5. 领域分类 + 证据指纹。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classify::{self, DomainDetection, DomainSource, KeywordBag};
use crate::evidence::{
    CertificateEvidence, Evidence, EvidenceKind, ProjectEvidence, RepositoryEvidence,
};
use crate::fingerprint;
use crate::record::{join_domain, CredibilityLevel, RecordError, SkillRecord};
use crate::signals::{self, Evaluation, FileInventory, Signal, SignalConfig, SignalName};

// ==========================================
// 1. 权重表
// ==========================================

pub type WeightTable = &'static [(SignalName, f64)];

pub const REPOSITORY_WEIGHTS: WeightTable = &[
    (SignalName::CommitActivity, 0.20),
    (SignalName::CodeVolume, 0.10),
    (SignalName::LanguageDiversity, 0.10),
    (SignalName::CommunitySignals, 0.15),
    (SignalName::Documentation, 0.15),
    (SignalName::Recency, 0.10),
    (SignalName::RepoMaturity, 0.10),
    (SignalName::CodeQualitySignals, 0.10),
];

pub const CERTIFICATE_WEIGHTS: WeightTable = &[
    (SignalName::IssuerTrust, 0.35),
    (SignalName::DocumentIntegrity, 0.25),
    (SignalName::ContentCompleteness, 0.25),
    (SignalName::Recency, 0.15),
];

pub const PROJECT_WEIGHTS: WeightTable = &[
    (SignalName::CodeVolume, 0.20),
    (SignalName::LanguageDiversity, 0.15),
    (SignalName::Documentation, 0.20),
    (SignalName::Architecture, 0.15),
    (SignalName::TestPresence, 0.15),
    (SignalName::CiConfig, 0.05),
    (SignalName::CodeQualitySignals, 0.10),
];

pub fn weights_for(kind: EvidenceKind) -> WeightTable {
    match kind {
        EvidenceKind::Repository => REPOSITORY_WEIGHTS,
        EvidenceKind::Certificate => CERTIFICATE_WEIGHTS,
        EvidenceKind::Project => PROJECT_WEIGHTS,
    }
}

// ==========================================
// 2. 错误 / 配置 / 结果
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("不支持的证据种类: {0:?}")]
    UnsupportedEvidenceKind(String),
    #[error("{0} 证据不足: 没有任何评估器可以运行")]
    InsufficientEvidence(EvidenceKind),
    #[error("{kind} 元数据格式错误: {reason}")]
    InvalidMetadata { kind: EvidenceKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub signals: SignalConfig,
    /// `overall_score` 达到该值即视为通过验证
    pub verified_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            signals: SignalConfig::default(),
            verified_threshold: 0.4,
        }
    }
}

/// 一次证据分析的输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub evidence_kind: EvidenceKind,
    /// [0,1]
    pub overall_score: f64,
    pub domain: String,
    pub subdomain: Option<String>,
    pub domain_source: DomainSource,
    /// [0,1]，已运行评估器占比
    pub confidence: f64,
    /// 按权重表顺序，只包含实际运行的信号
    pub signals: Vec<Signal>,
    pub artifact_hash: String,
    pub credibility_level: CredibilityLevel,
    pub verified: bool,
    pub explanation: String,
}

impl ScoringResult {
    /// 0–100 的整数分，写入链上记录用
    pub fn record_score(&self) -> u64 {
        (self.overall_score * 100.0).round().clamp(0.0, 100.0) as u64
    }

    /// 生成待上链的 `SkillRecord`
    pub fn to_record(&self, mode: &str, timestamp: u64) -> Result<SkillRecord, RecordError> {
        SkillRecord::new(
            mode,
            join_domain(&self.domain, self.subdomain.as_deref()),
            self.record_score(),
            self.artifact_hash.clone(),
            timestamp,
        )
    }
}

// ==========================================
// 3. 引擎
// ==========================================

/// 打分引擎：无内部可变状态，可以在多个线程间共享
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// 从"种类字符串 + 无类型元数据"直接打分
    pub fn score_raw(
        &self,
        kind: &str,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<ScoringResult, ScoringError> {
        let evidence = Evidence::from_parts(kind, metadata).inspect_err(|e| {
            warn!("拒绝证据: {}", e);
        })?;
        self.score(&evidence, now)
    }

    /// 对证据打分
    ///
    /// `now` 由调用方传入，同样的证据和同样的 `now` 一定得到同样的结果。
    pub fn score(
        &self,
        evidence: &Evidence,
        now: DateTime<Utc>,
    ) -> Result<ScoringResult, ScoringError> {
        let kind = evidence.kind();
        let table = weights_for(kind);
        let ctx = Context::new(evidence);

        let signals: Vec<Signal> = table
            .iter()
            .filter_map(|(name, weight)| {
                self.evaluate(*name, &ctx, now)
                    .map(|eval| Signal::from_evaluation(*name, *weight, eval))
            })
            .collect();

        if signals.is_empty() {
            warn!(kind = %kind, "没有可运行的评估器");
            return Err(ScoringError::InsufficientEvidence(kind));
        }

        let weight_ran: f64 = signals.iter().map(|s| s.weight).sum();
        let weighted: f64 = signals.iter().map(|s| s.weighted_score).sum();
        let overall_score = if weight_ran > 0.0 {
            (weighted / weight_ran).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let confidence = signals.len() as f64 / table.len() as f64;

        let detection = classify::classify(ctx.declared_domain(), &ctx.languages, &ctx.keywords);
        let credibility_level = CredibilityLevel::from_score(overall_score * 100.0);
        let explanation = explain(credibility_level, overall_score, &detection, &signals);

        let result = ScoringResult {
            evidence_kind: kind,
            overall_score,
            domain: detection.domain,
            subdomain: detection.subdomain,
            domain_source: detection.source,
            confidence,
            signals,
            artifact_hash: fingerprint::artifact_hash(evidence),
            credibility_level,
            verified: overall_score >= self.config.verified_threshold,
            explanation,
        };

        debug!(
            kind = %kind,
            overall = result.overall_score,
            confidence = result.confidence,
            domain = %result.domain,
            "证据打分完成"
        );
        Ok(result)
    }

    /// 运行单个评估器；返回 None 表示所需元数据完全缺失，该信号被跳过
    fn evaluate(&self, name: SignalName, ctx: &Context, now: DateTime<Utc>) -> Option<Evaluation> {
        let cfg = &self.config.signals;
        match ctx.evidence {
            Evidence::Repository(repo) => evaluate_repository(name, repo, ctx, cfg, now),
            Evidence::Certificate(cert) => evaluate_certificate(name, cert, cfg, now),
            Evidence::Project(project) => evaluate_project(name, project, ctx, cfg),
        }
    }
}

fn evaluate_repository(
    name: SignalName,
    repo: &RepositoryEvidence,
    ctx: &Context,
    cfg: &SignalConfig,
    now: DateTime<Utc>,
) -> Option<Evaluation> {
    match name {
        SignalName::CommitActivity => repo
            .contributors
            .as_deref()
            .map(|c| signals::commit_activity(c, cfg)),
        SignalName::CodeVolume => ctx.inventory.as_ref().map(|inv| signals::code_volume(inv, cfg)),
        SignalName::LanguageDiversity => repo
            .languages
            .as_ref()
            .map(|l| signals::language_diversity(l, cfg)),
        SignalName::CommunitySignals => repo
            .community
            .as_ref()
            .map(|c| signals::community_signals(c, cfg)),
        SignalName::Documentation => ctx
            .inventory
            .as_ref()
            .map(|inv| signals::documentation(inv, cfg)),
        SignalName::Recency => repo
            .pushed_at
            .map(|t| signals::recency(signals::age_days(t, now), &cfg.repository_recency)),
        SignalName::RepoMaturity => repo
            .created_at
            .map(|t| signals::maturity(signals::age_days(t, now), cfg)),
        SignalName::CodeQualitySignals => ctx.inventory.as_ref().map(signals::code_quality),
        _ => None,
    }
}

fn evaluate_certificate(
    name: SignalName,
    cert: &CertificateEvidence,
    cfg: &SignalConfig,
    now: DateTime<Utc>,
) -> Option<Evaluation> {
    match name {
        SignalName::IssuerTrust => Some(signals::issuer_trust(cert.issuer.as_deref(), cfg)),
        SignalName::DocumentIntegrity => Some(signals::document_integrity(cert)),
        SignalName::ContentCompleteness => Some(signals::content_completeness(cert)),
        SignalName::Recency => cert
            .issued_at
            .map(|t| signals::recency(signals::age_days(t, now), &cfg.certificate_recency)),
        _ => None,
    }
}

fn evaluate_project(
    name: SignalName,
    project: &ProjectEvidence,
    ctx: &Context,
    cfg: &SignalConfig,
) -> Option<Evaluation> {
    // 空压缩包等同于没有证据
    if project.files.is_empty() {
        return None;
    }
    let inv = ctx.inventory.as_ref()?;
    match name {
        SignalName::CodeVolume => Some(signals::code_volume(inv, cfg)),
        SignalName::LanguageDiversity => Some(signals::language_diversity(&ctx.languages, cfg)),
        SignalName::Documentation => Some(signals::documentation(inv, cfg)),
        SignalName::Architecture => Some(signals::architecture(inv)),
        SignalName::TestPresence => Some(signals::test_presence(inv)),
        SignalName::CiConfig => Some(signals::ci_config(inv)),
        SignalName::CodeQualitySignals => Some(signals::code_quality(inv)),
        _ => None,
    }
}

/// 一次打分中各评估器共用的派生数据
struct Context<'a> {
    evidence: &'a Evidence,
    inventory: Option<FileInventory>,
    languages: std::collections::BTreeMap<String, u64>,
    keywords: KeywordBag,
}

impl<'a> Context<'a> {
    fn new(evidence: &'a Evidence) -> Self {
        match evidence {
            Evidence::Repository(repo) => {
                let tree_paths = repo.tree.iter().flatten().map(|e| e.path.as_str());
                let keywords = KeywordBag::from_texts(
                    std::iter::once(repo.full_name.as_str())
                        .chain(repo.topics.iter().map(String::as_str))
                        .chain(tree_paths),
                );
                Self {
                    evidence,
                    inventory: repo.tree.as_deref().map(FileInventory::from_tree),
                    languages: repo.languages.clone().unwrap_or_default(),
                    keywords,
                }
            }
            Evidence::Certificate(cert) => Self {
                evidence,
                inventory: None,
                languages: Default::default(),
                keywords: KeywordBag::from_texts(
                    [cert.title.as_deref(), cert.issuer.as_deref()]
                        .into_iter()
                        .flatten(),
                ),
            },
            Evidence::Project(project) => {
                let paths = project.files.iter().map(|f| f.path.as_str());
                Self {
                    evidence,
                    inventory: Some(FileInventory::from_paths(paths.clone())),
                    languages: classify::detect_languages(&project.files),
                    keywords: KeywordBag::from_texts(
                        std::iter::once(project.name.as_str()).chain(paths),
                    ),
                }
            }
        }
    }

    fn declared_domain(&self) -> Option<&str> {
        match self.evidence {
            Evidence::Repository(repo) => repo.declared_domain.as_deref(),
            Evidence::Certificate(cert) => cert.declared_domain.as_deref(),
            Evidence::Project(project) => project.declared_domain.as_deref(),
        }
    }
}

/// 给前端看的一句话总结
fn explain(
    level: CredibilityLevel,
    overall: f64,
    detection: &DomainDetection,
    signals: &[Signal],
) -> String {
    let strongest = signals
        .iter()
        .max_by(|a, b| a.weighted_score.total_cmp(&b.weighted_score))
        .map(|s| s.explanation.as_str())
        .unwrap_or("none");
    let weakest = signals
        .iter()
        .find(|s| s.raw_score < 0.5)
        .map(|s| s.name.as_str().replace('_', " "))
        .unwrap_or_else(|| "None".to_string());

    format!(
        "Credibility: {} ({:.0}/100) in {}. Strengths: {}. Areas for improvement: {}.",
        level.label(),
        overall * 100.0,
        join_domain(&detection.domain, detection.subdomain.as_deref()),
        strongest,
        weakest
    )
}
