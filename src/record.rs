use serde::{Deserialize, Serialize};

/// 分数上限 (含)
pub const MAX_SCORE: u8 = 100;

/// `artifact_hash` 的固定长度：SHA-256 的 64 位小写 Hex
pub const ARTIFACT_HASH_LEN: usize = 64;

/// 技能存证记录 (SkillRecord)
///
/// **职责**: 链上一条不可变的"打分证据"。
/// 一旦被账本确认就只会被追加到该钱包的记录序列末尾，永不修改、永不删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRecord {
    /// 打分模式标签，例如 "ai-graded"、"self-attested"
    pub mode: String,

    /// 技能领域，可带子领域："python" 或 "python:ml"
    pub domain: String,

    /// 0–100 (含两端)
    pub score: u8,

    /// 原始证据的 SHA-256 (64 字符 Hex)
    pub artifact_hash: String,

    /// Unix 秒级时间戳，由客户端提供，不保证严格单调
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("score {0} 超出范围 (0..=100)")]
    ScoreOutOfRange(u64),
    #[error("timestamp 必须大于 0")]
    ZeroTimestamp,
    #[error("artifact_hash 必须是 64 位 Hex，实际: {0:?}")]
    MalformedArtifactHash(String),
    #[error("domain 不能为空")]
    EmptyDomain,
}

impl SkillRecord {
    /// 构造并校验一条记录
    pub fn new(
        mode: impl Into<String>,
        domain: impl Into<String>,
        score: u64,
        artifact_hash: impl Into<String>,
        timestamp: u64,
    ) -> Result<Self, RecordError> {
        let record = Self {
            mode: mode.into(),
            domain: domain.into(),
            score: u8::try_from(score)
                .ok()
                .filter(|s| *s <= MAX_SCORE)
                .ok_or(RecordError::ScoreOutOfRange(score))?,
            artifact_hash: artifact_hash.into(),
            timestamp,
        };
        record.validate()?;
        Ok(record)
    }

    /// 校验不变量：score ∈ [0,100]、timestamp > 0、artifact_hash 为 64 位 Hex
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.score > MAX_SCORE {
            return Err(RecordError::ScoreOutOfRange(self.score as u64));
        }
        if self.timestamp == 0 {
            return Err(RecordError::ZeroTimestamp);
        }
        if !is_artifact_hash(&self.artifact_hash) {
            return Err(RecordError::MalformedArtifactHash(self.artifact_hash.clone()));
        }
        if self.domain.trim().is_empty() {
            return Err(RecordError::EmptyDomain);
        }
        Ok(())
    }

    /// 主领域 ("python:ml" -> "python")
    pub fn primary_domain(&self) -> &str {
        split_domain(&self.domain).0
    }

    /// 子领域 ("python:ml" -> Some("ml"))
    pub fn subdomain(&self) -> Option<&str> {
        split_domain(&self.domain).1
    }
}

/// 可信度等级，由 0–100 分数决定，区间下界包含在内
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredibilityLevel {
    Minimal,
    Developing,
    Moderate,
    Strong,
    Exceptional,
}

impl CredibilityLevel {
    /// ≥90 exceptional, 70–89 strong, 50–69 moderate, 30–49 developing, 其余 minimal
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            CredibilityLevel::Exceptional
        } else if score >= 70.0 {
            CredibilityLevel::Strong
        } else if score >= 50.0 {
            CredibilityLevel::Moderate
        } else if score >= 30.0 {
            CredibilityLevel::Developing
        } else {
            CredibilityLevel::Minimal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CredibilityLevel::Minimal => "Minimal",
            CredibilityLevel::Developing => "Developing",
            CredibilityLevel::Moderate => "Moderate",
            CredibilityLevel::Strong => "Strong",
            CredibilityLevel::Exceptional => "Exceptional",
        }
    }
}

/// 拼接 `domain:subdomain`，子领域为空时只返回主领域
pub fn join_domain(domain: &str, subdomain: Option<&str>) -> String {
    match subdomain {
        Some(sub) if !sub.is_empty() => format!("{}:{}", domain, sub),
        _ => domain.to_string(),
    }
}

pub fn split_domain(domain: &str) -> (&str, Option<&str>) {
    match domain.split_once(':') {
        Some((primary, sub)) if !sub.is_empty() => (primary, Some(sub)),
        Some((primary, _)) => (primary, None),
        None => (domain, None),
    }
}

pub fn is_artifact_hash(s: &str) -> bool {
    s.len() == ARTIFACT_HASH_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn test_new_validates_fields() {
        assert!(SkillRecord::new("ai-graded", "python", 80, HASH, 1_700_000_000).is_ok());
        assert_eq!(
            SkillRecord::new("ai-graded", "python", 101, HASH, 1).unwrap_err(),
            RecordError::ScoreOutOfRange(101)
        );
        assert_eq!(
            SkillRecord::new("ai-graded", "python", 50, HASH, 0).unwrap_err(),
            RecordError::ZeroTimestamp
        );
        assert!(matches!(
            SkillRecord::new("ai-graded", "python", 50, "abc", 1),
            Err(RecordError::MalformedArtifactHash(_))
        ));
    }

    #[test]
    fn test_credibility_boundaries_are_inclusive() {
        assert_eq!(CredibilityLevel::from_score(90.0), CredibilityLevel::Exceptional);
        assert_eq!(CredibilityLevel::from_score(89.99), CredibilityLevel::Strong);
        assert_eq!(CredibilityLevel::from_score(70.0), CredibilityLevel::Strong);
        assert_eq!(CredibilityLevel::from_score(50.0), CredibilityLevel::Moderate);
        assert_eq!(CredibilityLevel::from_score(30.0), CredibilityLevel::Developing);
        assert_eq!(CredibilityLevel::from_score(29.9), CredibilityLevel::Minimal);
        assert_eq!(CredibilityLevel::from_score(0.0), CredibilityLevel::Minimal);
    }

    #[test]
    fn test_domain_split() {
        let record = SkillRecord::new("ai-graded", "python:ml", 70, HASH, 10).unwrap();
        assert_eq!(record.primary_domain(), "python");
        assert_eq!(record.subdomain(), Some("ml"));
        assert_eq!(split_domain("rust"), ("rust", None));
        assert_eq!(split_domain("rust:"), ("rust", None));
        assert_eq!(join_domain("web", Some("frontend")), "web:frontend");
        assert_eq!(join_domain("web", None), "web");
    }
}
