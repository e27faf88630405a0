//! 声誉聚合引擎 (Reputation Aggregation Engine)
//!
//! 输入：某个钱包解码后的全部 `SkillRecord` (最旧在前)。
//! 输出：`ReputationProfile`，每次请求都从完整记录序列重新计算，从不持久化。
//!
//! ## 公式
//!
//! ```text
//! decay_weight     = exp(-0.693 * age_days / 180)           (180 天半衰期)
//! weighted_score   = Σ(score * w) / Σ(w)
//! consistency      = 1 - min(1, std_dev(scores) / 30)
//! diversity        = min(1, distinct_domains / 4)
//! volume           = min(1, records / 10)
//! longevity        = min(1, oldest_age_days / 180)          (单条记录时为 0)
//! trust_index      = 0.40*weighted_score/100 + 0.20*consistency
//!                  + 0.10*diversity + 0.10*volume + 0.20*longevity
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::codec::{self, DecodeError};
use crate::record::{CredibilityLevel, SkillRecord};

const SECONDS_PER_DAY: f64 = 86_400.0;

// ==========================================
// 1. 配置
// ==========================================

/// 信任指数各项权重，和为 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustWeights {
    pub score: f64,
    pub consistency: f64,
    pub diversity: f64,
    pub volume: f64,
    pub longevity: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            score: 0.40,
            consistency: 0.20,
            diversity: 0.10,
            volume: 0.10,
            longevity: 0.20,
        }
    }
}

impl TrustWeights {
    pub fn sum(&self) -> f64 {
        self.score + self.consistency + self.diversity + self.volume + self.longevity
    }
}

/// 认证徽章门槛
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadgeRule {
    pub min_records: usize,
    pub min_reputation: f64,
    pub min_domains: usize,
}

impl Default for BadgeRule {
    fn default() -> Self {
        Self {
            min_records: 3,
            min_reputation: 50.0,
            min_domains: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// ln(2) 的近似值
    pub decay_constant: f64,
    pub half_life_days: f64,
    /// 标准差达到该值时 consistency 归零
    pub consistency_scale: f64,
    pub diversity_target: f64,
    pub volume_target: f64,
    pub longevity_target_days: f64,
    /// 近期均值与早期均值差距超过该值才算 rising / declining
    pub trend_threshold: f64,
    pub trust: TrustWeights,
    pub badge: BadgeRule,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            decay_constant: 0.693,
            half_life_days: 180.0,
            consistency_scale: 30.0,
            diversity_target: 4.0,
            volume_target: 10.0,
            longevity_target_days: 180.0,
            trend_threshold: 5.0,
            trust: TrustWeights::default(),
            badge: BadgeRule::default(),
        }
    }
}

impl ReputationConfig {
    /// 指数衰减权重，`age_days = half_life_days` 时约为 0.5
    pub fn decay_weight(&self, age_days: f64) -> f64 {
        (-self.decay_constant * age_days.max(0.0) / self.half_life_days).exp()
    }
}

// ==========================================
// 2. 输出类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: String,
    /// 0–100，领域内的衰减加权均值
    pub score: f64,
    pub consistency: f64,
    pub record_count: usize,
    pub latest_timestamp: u64,
    pub trend: Trend,
}

/// 信任指数的各项分量 (均在 [0,1])，便于审计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrustBreakdown {
    pub weighted_score_norm: f64,
    pub consistency: f64,
    pub diversity: f64,
    pub volume: f64,
    pub longevity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationProfile {
    pub wallet: String,
    /// 0–100，衰减加权均值
    pub total_reputation: f64,
    pub credibility_level: CredibilityLevel,
    /// [0,1]
    pub trust_index: f64,
    pub trust_breakdown: TrustBreakdown,
    pub verification_badge: bool,
    pub total_records: usize,
    pub distinct_domains: usize,
    pub top_domain: Option<String>,
    /// 最早一条记录的时间戳
    pub active_since: Option<u64>,
    /// 按分数从高到低
    pub domain_scores: Vec<DomainScore>,
}

impl ReputationProfile {
    fn empty(wallet: &str) -> Self {
        Self {
            wallet: wallet.to_string(),
            total_reputation: 0.0,
            credibility_level: CredibilityLevel::Minimal,
            trust_index: 0.0,
            trust_breakdown: TrustBreakdown::default(),
            verification_badge: false,
            total_records: 0,
            distinct_domains: 0,
            top_domain: None,
            active_since: None,
            domain_scores: Vec::new(),
        }
    }
}

/// 时间线上的一条事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub domain: String,
    pub score: u8,
    pub mode: String,
    pub timestamp: u64,
    pub artifact_hash: String,
    /// "Mar 05, 2025 • 14:03 UTC"
    pub date_display: String,
}

// ==========================================
// 3. 引擎
// ==========================================

#[derive(Debug, Clone, Default)]
pub struct ReputationEngine {
    config: ReputationConfig,
}

impl ReputationEngine {
    pub fn new(config: ReputationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    /// 直接从 Box 原始字节聚合；解码失败时整体失败，不会对部分记录打分
    pub fn aggregate_blob(
        &self,
        wallet: &str,
        blob: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ReputationProfile, DecodeError> {
        let records = codec::decode(blob)?;
        Ok(self.aggregate(wallet, &records, now))
    }

    /// 聚合一个钱包的全部记录
    pub fn aggregate(
        &self,
        wallet: &str,
        records: &[SkillRecord],
        now: DateTime<Utc>,
    ) -> ReputationProfile {
        if records.is_empty() {
            return ReputationProfile::empty(wallet);
        }
        let cfg = &self.config;
        let now_secs = now.timestamp();

        // 1–2. 衰减加权均值
        let weighted: Vec<Weighted> = records
            .iter()
            .map(|r| Weighted::new(r, now_secs, cfg))
            .collect();
        let all: Vec<&Weighted> = weighted.iter().collect();
        let total_reputation = decayed_mean(&all).clamp(0.0, 100.0);

        // 3–6. 各项分量
        let groups = group_by_domain(&weighted);
        let distinct_domains = groups.len();
        let oldest_age_days = weighted
            .iter()
            .map(|w| w.age_days)
            .fold(0.0_f64, f64::max);

        let breakdown = TrustBreakdown {
            weighted_score_norm: total_reputation / 100.0,
            consistency: consistency(weighted.iter().map(|w| w.score), cfg),
            diversity: ratio(distinct_domains as f64, cfg.diversity_target),
            volume: ratio(records.len() as f64, cfg.volume_target),
            longevity: if records.len() < 2 {
                0.0
            } else {
                ratio(oldest_age_days, cfg.longevity_target_days)
            },
        };

        // 7. 信任指数
        let w = &cfg.trust;
        let trust_index = (breakdown.weighted_score_norm * w.score
            + breakdown.consistency * w.consistency
            + breakdown.diversity * w.diversity
            + breakdown.volume * w.volume
            + breakdown.longevity * w.longevity)
            .clamp(0.0, 1.0);

        // 10. 分领域
        let mut domain_scores: Vec<DomainScore> = groups
            .into_iter()
            .map(|(domain, members)| self.domain_score(domain, &members))
            .collect();
        domain_scores.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.record_count.cmp(&a.record_count))
                .then_with(|| a.domain.cmp(&b.domain))
        });

        // 11. 徽章
        let badge = &cfg.badge;
        let verification_badge = records.len() >= badge.min_records
            && total_reputation >= badge.min_reputation
            && distinct_domains >= badge.min_domains;

        let profile = ReputationProfile {
            wallet: wallet.to_string(),
            total_reputation,
            credibility_level: CredibilityLevel::from_score(total_reputation),
            trust_index,
            trust_breakdown: breakdown,
            verification_badge,
            total_records: records.len(),
            distinct_domains,
            top_domain: domain_scores.first().map(|d| d.domain.clone()),
            active_since: records.iter().map(|r| r.timestamp).min(),
            domain_scores,
        };

        debug!(
            wallet = %wallet,
            records = profile.total_records,
            reputation = profile.total_reputation,
            trust_index = profile.trust_index,
            "声誉聚合完成"
        );
        profile
    }

    fn domain_score(&self, domain: &str, members: &[&Weighted]) -> DomainScore {
        DomainScore {
            domain: domain.to_string(),
            score: decayed_mean(members).clamp(0.0, 100.0),
            consistency: consistency(members.iter().map(|w| w.score), &self.config),
            record_count: members.len(),
            latest_timestamp: members.iter().map(|w| w.timestamp).max().unwrap_or(0),
            trend: trend(members, self.config.trend_threshold),
        }
    }
}

/// 按时间排序后的记录列表 (时间相同保持追加顺序)
pub fn timeline(records: &[SkillRecord]) -> Vec<TimelineEvent> {
    let mut sorted: Vec<&SkillRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);
    sorted
        .into_iter()
        .map(|r| TimelineEvent {
            domain: r.domain.clone(),
            score: r.score,
            mode: r.mode.clone(),
            timestamp: r.timestamp,
            artifact_hash: r.artifact_hash.clone(),
            date_display: date_display(r.timestamp),
        })
        .collect()
}

fn date_display(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%b %d, %Y • %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// ==========================================
// 4. 内部计算
// ==========================================

/// 带衰减权重的记录视图
#[derive(Debug)]
struct Weighted {
    domain: String,
    score: f64,
    timestamp: u64,
    age_days: f64,
    weight: f64,
}

impl Weighted {
    fn new(record: &SkillRecord, now_secs: i64, cfg: &ReputationConfig) -> Self {
        // 时间戳由客户端提供，未来时间按 0 天计
        let age_secs = (now_secs as i128 - record.timestamp as i128).max(0) as f64;
        let age_days = age_secs / SECONDS_PER_DAY;
        Self {
            domain: record.primary_domain().to_string(),
            score: record.score as f64,
            timestamp: record.timestamp,
            age_days,
            weight: cfg.decay_weight(age_days),
        }
    }
}

/// Σ(score*w)/Σ(w)；权重全部下溢为 0 时退化为算术平均
///
/// 以最低分为基准累加偏移量，结果不会低于最低分；分数全部相同时精确等于该分数。
fn decayed_mean(items: &[&Weighted]) -> f64 {
    let Some(base) = items.iter().map(|w| w.score).reduce(f64::min) else {
        return 0.0;
    };
    let total_weight: f64 = items.iter().map(|w| w.weight).sum();
    let offset = if total_weight > 0.0 && total_weight.is_finite() {
        items.iter().map(|w| (w.score - base) * w.weight).sum::<f64>() / total_weight
    } else {
        items.iter().map(|w| w.score - base).sum::<f64>() / items.len() as f64
    };
    base + offset
}

/// `1 - min(1, std_dev / scale)`，不足两条时为 1
fn consistency(scores: impl Iterator<Item = f64>, cfg: &ReputationConfig) -> f64 {
    let scores: Vec<f64> = scores.collect();
    if scores.len() < 2 {
        return 1.0;
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (1.0 - (variance.sqrt() / cfg.consistency_scale).min(1.0)).clamp(0.0, 1.0)
}

fn ratio(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 1.0;
    }
    (value / target).clamp(0.0, 1.0)
}

fn group_by_domain(items: &[Weighted]) -> BTreeMap<&str, Vec<&Weighted>> {
    let mut groups: BTreeMap<&str, Vec<&Weighted>> = BTreeMap::new();
    for item in items {
        groups.entry(item.domain.as_str()).or_default().push(item);
    }
    groups
}

/// 最近三分之一 vs 之前三分之二 的衰减均值
fn trend(items: &[&Weighted], threshold: f64) -> Trend {
    if items.len() < 2 {
        return Trend::Stable;
    }
    let mut ordered = items.to_vec();
    ordered.sort_by_key(|w| w.timestamp);

    let recent_len = ordered.len().div_ceil(3);
    let (earlier, recent) = ordered.split_at(ordered.len() - recent_len);
    let delta = decayed_mean(recent) - decayed_mean(earlier);

    if delta > threshold {
        Trend::Rising
    } else if delta < -threshold {
        Trend::Declining
    } else {
        Trend::Stable
    }
}
