use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::scoring::ScoringError;

// ==========================================
// 1. 证据种类 (闭合枚举)
// ==========================================

/// 证据种类
///
/// 每个种类对应一张固定的权重表 (见 `scoring::weights_for`)，
/// 用闭合枚举而不是字符串动态查表，避免权重表与证据错配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Repository,
    Certificate,
    Project,
}

impl EvidenceKind {
    pub const ALL: [EvidenceKind; 3] = [
        EvidenceKind::Repository,
        EvidenceKind::Certificate,
        EvidenceKind::Project,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Repository => "repository",
            EvidenceKind::Certificate => "certificate",
            EvidenceKind::Project => "project",
        }
    }
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceKind {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repository" | "repo" | "github-repo" => Ok(EvidenceKind::Repository),
            "certificate" | "cert" => Ok(EvidenceKind::Certificate),
            "project" | "archive" => Ok(EvidenceKind::Project),
            other => Err(ScoringError::UnsupportedEvidenceKind(other.to_string())),
        }
    }
}

// ==========================================
// 2. 证据元数据
// ==========================================
// 外部的 Evidence Fetcher 负责把 API 响应 / 上传文件整理成下面的形状。
// `Option` 为 None 表示"这份元数据完全没拿到"，对应的信号会被跳过而不是记 0 分。

/// 代码仓库证据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEvidence {
    /// "owner/repo"
    pub full_name: String,

    /// 提交者显式声明的领域，优先级最高
    #[serde(default)]
    pub declared_domain: Option<String>,

    /// 语言 -> 字节数
    #[serde(default)]
    pub languages: Option<BTreeMap<String, u64>>,

    #[serde(default)]
    pub contributors: Option<Vec<Contributor>>,

    #[serde(default)]
    pub community: Option<CommunityStats>,

    /// 根目录文件树
    #[serde(default)]
    pub tree: Option<Vec<TreeEntry>>,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// 最近一次 push
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub contributions: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityStats {
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// git 对象哈希，缺失时清单里写空
    #[serde(default)]
    pub sha: Option<String>,
}

/// 证书证据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateEvidence {
    pub file_name: String,

    /// 上传文件的原始字节 (JSON 中为 Hex 字符串)
    #[serde(with = "hex_bytes")]
    pub file_bytes: Vec<u8>,

    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub credential_id: Option<String>,
    #[serde(default)]
    pub verification_url: Option<String>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub declared_domain: Option<String>,
}

/// 项目压缩包证据 (已解压)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEvidence {
    pub name: String,
    #[serde(default)]
    pub declared_domain: Option<String>,
    pub files: Vec<ProjectFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// 相对于压缩包根目录的路径，使用 `/` 分隔
    pub path: String,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

// ==========================================
// 3. 证据 (带标签的闭合变体)
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "metadata", rename_all = "lowercase")]
pub enum Evidence {
    Repository(RepositoryEvidence),
    Certificate(CertificateEvidence),
    Project(ProjectEvidence),
}

impl Evidence {
    pub fn kind(&self) -> EvidenceKind {
        match self {
            Evidence::Repository(_) => EvidenceKind::Repository,
            Evidence::Certificate(_) => EvidenceKind::Certificate,
            Evidence::Project(_) => EvidenceKind::Project,
        }
    }

    /// 从"种类字符串 + 无类型元数据"组装证据
    ///
    /// 未知种类 -> `UnsupportedEvidenceKind`；元数据形状不符 -> `InvalidMetadata`。
    pub fn from_parts(kind: &str, metadata: serde_json::Value) -> Result<Self, ScoringError> {
        let kind: EvidenceKind = kind.parse()?;
        let invalid = |e: serde_json::Error| ScoringError::InvalidMetadata {
            kind,
            reason: e.to_string(),
        };
        Ok(match kind {
            EvidenceKind::Repository => {
                Evidence::Repository(serde_json::from_value(metadata).map_err(invalid)?)
            }
            EvidenceKind::Certificate => {
                Evidence::Certificate(serde_json::from_value(metadata).map_err(invalid)?)
            }
            EvidenceKind::Project => {
                Evidence::Project(serde_json::from_value(metadata).map_err(invalid)?)
            }
        })
    }
}

/// 字节数组在 JSON 中以 Hex 字符串传输
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("repo".parse::<EvidenceKind>().unwrap(), EvidenceKind::Repository);
        assert_eq!(" Certificate ".parse::<EvidenceKind>().unwrap(), EvidenceKind::Certificate);
        assert_eq!("archive".parse::<EvidenceKind>().unwrap(), EvidenceKind::Project);
        assert!(matches!(
            "video".parse::<EvidenceKind>(),
            Err(ScoringError::UnsupportedEvidenceKind(k)) if k == "video"
        ));
    }

    #[test]
    fn test_from_parts() {
        let evidence = Evidence::from_parts(
            "repository",
            json!({
                "full_name": "alice/tool",
                "languages": {"Rust": 1200},
                "community": {"stars": 3, "forks": 1, "watchers": 2},
                "tree": [{"path": "README.md", "type": "blob", "sha": "abc"}],
                "pushed_at": "2024-01-01T00:00:00Z"
            }),
        )
        .unwrap();
        let Evidence::Repository(repo) = evidence else {
            panic!("expected repository evidence");
        };
        assert_eq!(repo.full_name, "alice/tool");
        assert!(repo.contributors.is_none());
        assert_eq!(repo.tree.unwrap()[0].kind, EntryKind::Blob);

        let cert = Evidence::from_parts(
            "cert",
            json!({"file_name": "c.pdf", "file_bytes": "255044462d", "issuer": "Coursera"}),
        )
        .unwrap();
        assert_eq!(cert.kind(), EvidenceKind::Certificate);

        assert!(matches!(
            Evidence::from_parts("project", json!({"name": 3})),
            Err(ScoringError::InvalidMetadata { kind: EvidenceKind::Project, .. })
        ));
    }
}
