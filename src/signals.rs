//! 信号库 (Signal Library)
//!
//! 每个评估器都是纯函数：`(证据元数据) -> (raw_score ∈ [0,1], 解释文本)`。
//! 评估器之间互不依赖、没有共享状态，任意顺序 (或并行) 执行结果都一样。
//!
//! 是否"跳过"某个评估器由调用方 (scoring) 决定：元数据完全缺失时跳过，
//! 元数据存在但为空 (例如没有 README) 则照常评估并得 0。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::evidence::{CertificateEvidence, CommunityStats, Contributor, EntryKind, TreeEntry};

// ==========================================
// 1. 信号类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    CommitActivity,
    CodeVolume,
    LanguageDiversity,
    CommunitySignals,
    Documentation,
    Recency,
    RepoMaturity,
    CodeQualitySignals,
    IssuerTrust,
    DocumentIntegrity,
    ContentCompleteness,
    Architecture,
    TestPresence,
    CiConfig,
}

impl SignalName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::CommitActivity => "commit_activity",
            SignalName::CodeVolume => "code_volume",
            SignalName::LanguageDiversity => "language_diversity",
            SignalName::CommunitySignals => "community_signals",
            SignalName::Documentation => "documentation",
            SignalName::Recency => "recency",
            SignalName::RepoMaturity => "repo_maturity",
            SignalName::CodeQualitySignals => "code_quality_signals",
            SignalName::IssuerTrust => "issuer_trust",
            SignalName::DocumentIntegrity => "document_integrity",
            SignalName::ContentCompleteness => "content_completeness",
            SignalName::Architecture => "architecture",
            SignalName::TestPresence => "test_presence",
            SignalName::CiConfig => "ci_config",
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 评估器的原始输出
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub raw_score: f64,
    pub explanation: String,
}

impl Evaluation {
    fn new(raw_score: f64, explanation: impl Into<String>) -> Self {
        Self {
            raw_score: raw_score.clamp(0.0, 1.0),
            explanation: explanation.into(),
        }
    }
}

/// 一次打分中某个信号的完整记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: SignalName,
    /// 固定权重
    pub weight: f64,
    pub raw_score: f64,
    /// `raw_score * weight`
    pub weighted_score: f64,
    pub explanation: String,
}

impl Signal {
    pub fn from_evaluation(name: SignalName, weight: f64, eval: Evaluation) -> Self {
        Self {
            name,
            weight,
            raw_score: eval.raw_score,
            weighted_score: eval.raw_score * weight,
            explanation: eval.explanation,
        }
    }
}

// ==========================================
// 2. 阈值配置
// ==========================================

/// 新近度阶梯：≤excellent -> 1.0, ≤good -> 0.7, ≤acceptable -> 0.4, 否则 0.1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyLadder {
    pub excellent_days: i64,
    pub good_days: i64,
    pub acceptable_days: i64,
}

impl RecencyLadder {
    pub const REPOSITORY: RecencyLadder = RecencyLadder {
        excellent_days: 7,
        good_days: 30,
        acceptable_days: 90,
    };

    /// 证书老化得慢，阶梯按年放宽
    pub const CERTIFICATE: RecencyLadder = RecencyLadder {
        excellent_days: 365,
        good_days: 730,
        acceptable_days: 1095,
    };
}

/// 社区信号的饱和常数 `x / (x + k)`：k 即得到 0.5 分所需的数量
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommunityCurve {
    pub stars_half: f64,
    pub forks_half: f64,
    pub watchers_half: f64,
}

impl Default for CommunityCurve {
    fn default() -> Self {
        Self {
            stars_half: 50.0,
            forks_half: 20.0,
            watchers_half: 25.0,
        }
    }
}

/// 签发机构信任表
///
/// 机构名按单词切分后做"连续子序列"匹配 ("Amazon Web Services Training" 命中
/// "amazon web services"，而 "Summit Academy" 不会命中 "mit")。多条命中时取最长的键。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerTrustTable {
    pub entries: BTreeMap<String, f64>,
    /// 未知机构的保守基线
    pub default_trust: f64,
}

impl Default for IssuerTrustTable {
    fn default() -> Self {
        let entries = [
            ("amazon web services", 0.95),
            ("aws", 0.95),
            ("google", 0.95),
            ("microsoft", 0.95),
            ("oracle", 0.9),
            ("cisco", 0.9),
            ("comptia", 0.9),
            ("isc2", 0.9),
            ("linux foundation", 0.9),
            ("cncf", 0.9),
            ("mit", 0.9),
            ("stanford", 0.9),
            ("harvard", 0.9),
            ("algorand foundation", 0.85),
            ("ethereum foundation", 0.85),
            ("ibm", 0.85),
            ("meta", 0.85),
            ("coursera", 0.8),
            ("edx", 0.8),
            ("udacity", 0.75),
            ("freecodecamp", 0.7),
            ("hackerrank", 0.7),
            ("linkedin learning", 0.65),
            ("udemy", 0.6),
        ]
        .into_iter()
        .map(|(name, trust)| (name.to_string(), trust))
        .collect();

        Self {
            entries,
            default_trust: 0.4,
        }
    }
}

impl IssuerTrustTable {
    /// 查表，返回 (命中的键, 信任值)；未命中时键为 None
    pub fn lookup(&self, issuer: &str) -> (Option<&str>, f64) {
        let issuer_words = words(issuer);
        self.entries
            .iter()
            .filter(|(key, _)| contains_run(&issuer_words, &words(key)))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .map(|(key, trust)| (Some(key.as_str()), *trust))
            .unwrap_or((None, self.default_trust))
    }
}

/// 信号库的全部数值阈值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// 贡献次数达到该值即满分
    pub commit_high: f64,
    pub file_count_high: f64,
    pub language_high: f64,
    /// 文档信号满分线
    pub documentation_high: f64,
    /// 仓库年龄达到该天数即满分
    pub maturity_established_days: f64,
    pub repository_recency: RecencyLadder,
    pub certificate_recency: RecencyLadder,
    pub community: CommunityCurve,
    pub issuers: IssuerTrustTable,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            commit_high: 200.0,
            file_count_high: 100.0,
            language_high: 6.0,
            documentation_high: 10.0,
            maturity_established_days: 365.0,
            repository_recency: RecencyLadder::REPOSITORY,
            certificate_recency: RecencyLadder::CERTIFICATE,
            community: CommunityCurve::default(),
            issuers: IssuerTrustTable::default(),
        }
    }
}

// ==========================================
// 3. 文件清单
// ==========================================

const DOC_FILES: &[&str] = &[
    "readme.md",
    "readme",
    "readme.rst",
    "readme.txt",
    "contributing.md",
    "changelog.md",
    "code_of_conduct.md",
];
const DOC_DIRS: &[&str] = &["docs", "doc"];
const CI_FILES: &[&str] = &[
    ".travis.yml",
    ".gitlab-ci.yml",
    "jenkinsfile",
    "azure-pipelines.yml",
    "bitbucket-pipelines.yml",
];
const CI_DIRS: &[&str] = &[".github", ".circleci"];
const CONFIG_FILES: &[&str] = &[
    "dockerfile",
    "docker-compose.yml",
    "makefile",
    "cargo.toml",
    "package.json",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "tsconfig.json",
    ".editorconfig",
];
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];
const TEST_CONFIG_FILES: &[&str] = &[
    "pytest.ini",
    "conftest.py",
    "tox.ini",
    "jest.config.js",
    "jest.config.ts",
    "vitest.config.ts",
    "karma.conf.js",
    ".mocharc.json",
];
const LICENSE_FILES: &[&str] = &["license", "license.md", "license.txt", "copying"];
const SOURCE_DIRS: &[&str] = &["src", "lib", "app", "pkg", "internal", "contracts", "cmd"];
const BUILD_MANIFESTS: &[&str] = &[
    "cargo.toml",
    "package.json",
    "pyproject.toml",
    "setup.py",
    "go.mod",
    "pom.xml",
    "build.gradle",
];

/// 文件清单：把仓库根目录树或项目文件列表统一成小写的 名字/目录/路径 集合
#[derive(Debug, Clone, Default)]
pub struct FileInventory {
    paths: BTreeSet<String>,
    /// 只含文件 (不含目录条目) 的路径
    files: BTreeSet<String>,
    names: BTreeSet<String>,
    dirs: BTreeSet<String>,
    file_count: usize,
    /// 最深的目录层级 (根目录文件为 0)
    max_depth: usize,
}

impl FileInventory {
    pub fn from_tree(tree: &[TreeEntry]) -> Self {
        Self::from_entries(
            tree.iter()
                .map(|e| (e.path.as_str(), e.kind == EntryKind::Tree)),
        )
    }

    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        Self::from_entries(paths.into_iter().map(|p| (p, false)))
    }

    fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        let mut inv = FileInventory::default();
        for (path, is_dir) in entries {
            let lower = path.trim_matches('/').to_ascii_lowercase();
            if lower.is_empty() {
                continue;
            }
            let parts: Vec<&str> = lower.split('/').collect();
            let (dir_parts, leaf) = parts.split_at(parts.len() - 1);
            for dir in dir_parts {
                inv.dirs.insert(dir.to_string());
            }
            if is_dir {
                inv.dirs.insert(leaf[0].to_string());
            } else {
                inv.names.insert(leaf[0].to_string());
                inv.files.insert(lower.clone());
                inv.file_count += 1;
                inv.max_depth = inv.max_depth.max(dir_parts.len());
            }
            inv.paths.insert(lower);
        }
        inv
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    fn has_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn has_dir(&self, dir: &str) -> bool {
        self.dirs.contains(dir)
    }

    fn count_names(&self, names: &[&str]) -> usize {
        names.iter().filter(|n| self.has_name(n)).count()
    }

    fn any_name(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.has_name(n))
    }

    fn any_dir(&self, dirs: &[&str]) -> bool {
        dirs.iter().any(|d| self.has_dir(d))
    }

    pub fn has_readme(&self) -> bool {
        self.names.iter().any(|n| n.starts_with("readme"))
    }

    pub fn has_license(&self) -> bool {
        self.any_name(LICENSE_FILES)
    }

    pub fn has_gitignore(&self) -> bool {
        self.has_name(".gitignore")
    }

    pub fn has_ci(&self) -> bool {
        self.any_name(CI_FILES) || self.any_dir(CI_DIRS)
    }

    pub fn has_dockerfile(&self) -> bool {
        self.has_name("dockerfile") || self.has_name("docker-compose.yml")
    }

    pub fn has_tests(&self) -> bool {
        self.any_dir(TEST_DIRS) || self.test_file_count() > 0
    }

    /// 形如 `test_x.py`、`x_test.go`、`x.test.js`、`x.spec.ts` 的文件
    pub fn test_file_count(&self) -> usize {
        self.files
            .iter()
            .filter_map(|p| p.rsplit('/').next())
            .filter(|name| is_test_file(name))
            .count()
    }

    pub fn doc_count(&self) -> usize {
        self.count_names(DOC_FILES) + usize::from(self.any_dir(DOC_DIRS))
    }

    pub fn config_count(&self) -> usize {
        self.count_names(CONFIG_FILES)
    }

    pub fn top_level_dirs(&self) -> usize {
        self.paths
            .iter()
            .filter_map(|p| p.split_once('/').map(|(top, _)| top))
            .collect::<BTreeSet<_>>()
            .len()
    }
}

fn is_test_file(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or("");
    name.contains(".test.")
        || name.contains(".spec.")
        || (stem.starts_with("test_") && name.contains('.'))
        || stem.ends_with("_test")
}

// ==========================================
// 4. 评估器
// ==========================================

/// 线性归一化到 [0,1] 并截断
pub fn normalize(value: f64, low: f64, high: f64) -> f64 {
    if high <= low {
        return 0.0;
    }
    ((value - low) / (high - low)).clamp(0.0, 1.0)
}

/// 边际递减曲线 `x / (x + half)`，离群值无法线性拉满
pub fn saturate(value: f64, half: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    if half <= 0.0 {
        return 1.0;
    }
    value / (value + half)
}

/// 从 `from` 到 `now` 的整天数，未来时间按 0 计
pub fn age_days(from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - from).num_days().max(0)
}

pub fn commit_activity(contributors: &[Contributor], cfg: &SignalConfig) -> Evaluation {
    // 计数来自客户端，饱和相加
    let total = contributors
        .iter()
        .fold(0u64, |acc, c| acc.saturating_add(c.contributions));
    Evaluation::new(
        normalize(total as f64, 0.0, cfg.commit_high),
        format!(
            "{} total contributions across {} contributors",
            total,
            contributors.len()
        ),
    )
}

pub fn code_volume(inv: &FileInventory, cfg: &SignalConfig) -> Evaluation {
    let files = inv.file_count();
    Evaluation::new(
        normalize(files as f64, 0.0, cfg.file_count_high),
        format!("{} files", files),
    )
}

pub fn language_diversity(languages: &BTreeMap<String, u64>, cfg: &SignalConfig) -> Evaluation {
    let mut by_size: Vec<_> = languages.iter().collect();
    by_size.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let listed: Vec<&str> = by_size.iter().take(5).map(|(l, _)| l.as_str()).collect();

    Evaluation::new(
        normalize(languages.len() as f64, 0.0, cfg.language_high),
        if listed.is_empty() {
            "Languages: none detected".to_string()
        } else {
            format!("Languages: {}", listed.join(", "))
        },
    )
}

/// `0.5*stars + 0.3*forks + 0.2*watchers`，每项都先过饱和曲线
pub fn community_signals(stats: &CommunityStats, cfg: &SignalConfig) -> Evaluation {
    let curve = &cfg.community;
    let raw = 0.5 * saturate(stats.stars as f64, curve.stars_half)
        + 0.3 * saturate(stats.forks as f64, curve.forks_half)
        + 0.2 * saturate(stats.watchers as f64, curve.watchers_half);
    Evaluation::new(
        raw,
        format!(
            "{} stars, {} forks, {} watchers",
            stats.stars, stats.forks, stats.watchers
        ),
    )
}

/// 文档: docs 数 + CI(2) + min(配置,3) + 测试(2)，满分线 `documentation_high`
pub fn documentation(inv: &FileInventory, cfg: &SignalConfig) -> Evaluation {
    let docs = inv.doc_count();
    let ci = inv.has_ci();
    let configs = inv.config_count();
    let tests = inv.has_tests();

    let points = docs + if ci { 2 } else { 0 } + configs.min(3) + if tests { 2 } else { 0 };
    Evaluation::new(
        normalize(points as f64, 0.0, cfg.documentation_high),
        format!(
            "Docs: {}, CI: {}, Config: {}, Tests: {}",
            docs, ci, configs, tests
        ),
    )
}

pub fn recency(age_days: i64, ladder: &RecencyLadder) -> Evaluation {
    let raw = if age_days <= ladder.excellent_days {
        1.0
    } else if age_days <= ladder.good_days {
        0.7
    } else if age_days <= ladder.acceptable_days {
        0.4
    } else {
        0.1
    };
    Evaluation::new(raw, format!("Last activity {} day(s) ago", age_days))
}

/// 成熟度：线性增长，`maturity_established_days` 天后封顶 1.0
pub fn maturity(age_days: i64, cfg: &SignalConfig) -> Evaluation {
    Evaluation::new(
        normalize(age_days as f64, 0.0, cfg.maturity_established_days),
        format!("Repository age: {} days", age_days),
    )
}

/// 代码质量启发式：LICENSE / .gitignore / README / CI / 测试 五个布尔位
pub fn code_quality(inv: &FileInventory) -> Evaluation {
    let bits = [
        inv.has_license(),
        inv.has_gitignore(),
        inv.has_readme(),
        inv.has_ci(),
        inv.has_tests(),
    ];
    let present = bits.iter().filter(|b| **b).count();
    Evaluation::new(
        present as f64 / bits.len() as f64,
        format!(
            "License: {}, .gitignore: {}, README: {}, CI: {}, Tests: {}",
            bits[0], bits[1], bits[2], bits[3], bits[4]
        ),
    )
}

pub fn issuer_trust(issuer: Option<&str>, cfg: &SignalConfig) -> Evaluation {
    let table = &cfg.issuers;
    match issuer.map(str::trim).filter(|s| !s.is_empty()) {
        None => Evaluation::new(
            table.default_trust,
            "No issuer declared; baseline trust applied",
        ),
        Some(name) => match table.lookup(name) {
            (Some(key), trust) => {
                Evaluation::new(trust, format!("Recognised issuer '{}' ({})", name, key))
            }
            (None, trust) => Evaluation::new(
                trust,
                format!("Unrecognised issuer '{}'; baseline trust applied", name),
            ),
        },
    }
}

/// 已知的证书文件格式 (魔数, 允许的扩展名)
const DOCUMENT_FORMATS: &[(&str, &[u8], &[&str])] = &[
    ("pdf", b"%PDF-", &["pdf"]),
    ("png", b"\x89PNG\r\n\x1a\n", &["png"]),
    ("jpeg", b"\xFF\xD8\xFF", &["jpg", "jpeg"]),
];
const MIN_DOCUMENT_BYTES: usize = 1024;
const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// 文件完整性：格式可识别 0.6 + 扩展名与内容一致 0.2 + 大小合理 0.2
pub fn document_integrity(cert: &CertificateEvidence) -> Evaluation {
    let bytes = &cert.file_bytes;
    if bytes.is_empty() {
        return Evaluation::new(0.0, "Empty document");
    }

    let format = DOCUMENT_FORMATS
        .iter()
        .find(|(_, magic, _)| bytes.starts_with(magic));
    let extension = cert
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let size_ok = (MIN_DOCUMENT_BYTES..=MAX_DOCUMENT_BYTES).contains(&bytes.len());

    let mut raw = 0.0;
    let detected = match format {
        Some((label, _, exts)) => {
            raw += 0.6;
            if extension.as_deref().is_some_and(|e| exts.contains(&e)) {
                raw += 0.2;
            }
            *label
        }
        None => "unknown",
    };
    if size_ok {
        raw += 0.2;
    }

    Evaluation::new(
        raw,
        format!(
            "Format: {}, extension: {}, size: {} bytes",
            detected,
            extension.as_deref().unwrap_or("none"),
            bytes.len()
        ),
    )
}

/// 证书字段完整度：标题 / 获得者 / 证书编号 / 验证链接 / 签发日期
pub fn content_completeness(cert: &CertificateEvidence) -> Evaluation {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    let fields = [
        ("title", present(&cert.title)),
        ("recipient", present(&cert.recipient)),
        ("credential_id", present(&cert.credential_id)),
        ("verification_url", present(&cert.verification_url)),
        ("issued_at", cert.issued_at.is_some()),
    ];
    let found: Vec<&str> = fields.iter().filter(|(_, ok)| *ok).map(|(n, _)| *n).collect();
    Evaluation::new(
        found.len() as f64 / fields.len() as f64,
        format!("{}/{} fields present: {}", found.len(), fields.len(), found.join(", ")),
    )
}

/// 架构：源码目录 / 构建清单 / 多模块 (≥3 个顶层目录) / 目录嵌套 ≥2 层
pub fn architecture(inv: &FileInventory) -> Evaluation {
    let source_dir = inv.any_dir(SOURCE_DIRS);
    let manifest = inv.any_name(BUILD_MANIFESTS);
    let modular = inv.top_level_dirs() >= 3;
    let nested = inv.max_depth >= 2;
    let present = [source_dir, manifest, modular, nested]
        .iter()
        .filter(|b| **b)
        .count();
    Evaluation::new(
        present as f64 / 4.0,
        format!(
            "Source dir: {}, manifest: {}, modular: {}, nested: {}",
            source_dir, manifest, modular, nested
        ),
    )
}

/// 测试：测试目录 / 测试文件 / 测试框架配置
pub fn test_presence(inv: &FileInventory) -> Evaluation {
    let test_dir = inv.any_dir(TEST_DIRS);
    let test_files = inv.test_file_count();
    let test_config = inv.any_name(TEST_CONFIG_FILES);
    let present = [test_dir, test_files > 0, test_config]
        .iter()
        .filter(|b| **b)
        .count();
    Evaluation::new(
        present as f64 / 3.0,
        format!(
            "Test dir: {}, test files: {}, test config: {}",
            test_dir, test_files, test_config
        ),
    )
}

/// CI：有流水线配置 1.0；只有 Dockerfile / Makefile 这类构建自动化 0.5
pub fn ci_config(inv: &FileInventory) -> Evaluation {
    if inv.has_ci() {
        Evaluation::new(1.0, "CI pipeline configured")
    } else if inv.has_dockerfile() || inv.has_name("makefile") {
        Evaluation::new(0.5, "Build automation without CI pipeline")
    } else {
        Evaluation::new(0.0, "No CI or build automation")
    }
}

fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg() -> SignalConfig {
        SignalConfig::default()
    }

    #[test]
    fn test_recency_ladder_boundaries() {
        let ladder = RecencyLadder::REPOSITORY;
        assert_eq!(recency(0, &ladder).raw_score, 1.0);
        assert_eq!(recency(7, &ladder).raw_score, 1.0);
        assert_eq!(recency(8, &ladder).raw_score, 0.7);
        assert_eq!(recency(30, &ladder).raw_score, 0.7);
        assert_eq!(recency(90, &ladder).raw_score, 0.4);
        assert_eq!(recency(91, &ladder).raw_score, 0.1);
    }

    #[test]
    fn test_maturity_saturates_at_one_year() {
        assert_eq!(maturity(0, &cfg()).raw_score, 0.0);
        assert!((maturity(182, &cfg()).raw_score - 182.0 / 365.0).abs() < 1e-12);
        assert_eq!(maturity(365, &cfg()).raw_score, 1.0);
        assert_eq!(maturity(4000, &cfg()).raw_score, 1.0);
    }

    #[test]
    fn test_community_is_blended_and_saturating() {
        let none = community_signals(&CommunityStats::default(), &cfg());
        assert_eq!(none.raw_score, 0.0);

        // 恰好到半饱和点：0.5*0.5 + 0.3*0.5 + 0.2*0.5
        let half = community_signals(
            &CommunityStats {
                stars: 50,
                forks: 20,
                watchers: 25,
            },
            &cfg(),
        );
        assert!((half.raw_score - 0.5).abs() < 1e-12);

        // 离群值无法把分数推到 1
        let huge = community_signals(
            &CommunityStats {
                stars: 1_000_000,
                forks: 0,
                watchers: 0,
            },
            &cfg(),
        );
        assert!(huge.raw_score < 0.5);
    }

    #[test]
    fn test_issuer_lookup() {
        let c = cfg();
        assert_eq!(issuer_trust(Some("Coursera"), &c).raw_score, 0.8);
        assert_eq!(
            issuer_trust(Some("Amazon Web Services Training and Certification"), &c).raw_score,
            0.95
        );
        assert_eq!(issuer_trust(Some("Summit Academy"), &c).raw_score, 0.4);
        assert_eq!(issuer_trust(Some("Unknown Bootcamp"), &c).raw_score, 0.4);
        assert_eq!(issuer_trust(None, &c).raw_score, 0.4);
        assert_eq!(issuer_trust(Some("   "), &c).raw_score, 0.4);
    }

    #[test]
    fn test_inventory_from_repository_root() {
        let tree = vec![
            TreeEntry {
                path: "README.md".into(),
                kind: EntryKind::Blob,
                sha: None,
            },
            TreeEntry {
                path: "LICENSE".into(),
                kind: EntryKind::Blob,
                sha: None,
            },
            TreeEntry {
                path: ".github".into(),
                kind: EntryKind::Tree,
                sha: None,
            },
            TreeEntry {
                path: "tests".into(),
                kind: EntryKind::Tree,
                sha: None,
            },
            TreeEntry {
                path: "Cargo.toml".into(),
                kind: EntryKind::Blob,
                sha: None,
            },
        ];
        let inv = FileInventory::from_tree(&tree);
        assert_eq!(inv.file_count(), 3);
        assert!(inv.has_ci());
        assert!(inv.has_tests());

        let quality = code_quality(&inv);
        assert!((quality.raw_score - 0.8).abs() < 1e-12);

        // 1 doc + 2 CI + 1 config + 2 tests = 6 / 10
        let docs = documentation(&inv, &cfg());
        assert!((docs.raw_score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_project_structure_signals() {
        let inv = FileInventory::from_paths([
            "Cargo.toml",
            "src/main.rs",
            "src/codec/mod.rs",
            "tests/codec_test.rs",
            "docs/guide.md",
            ".github/workflows/ci.yml",
        ]);
        assert_eq!(architecture(&inv).raw_score, 1.0);
        assert!((test_presence(&inv).raw_score - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(ci_config(&inv).raw_score, 1.0);

        let bare = FileInventory::from_paths(["main.py", "Dockerfile"]);
        assert_eq!(ci_config(&bare).raw_score, 0.5);
        assert_eq!(test_presence(&bare).raw_score, 0.0);
        assert_eq!(architecture(&bare).raw_score, 0.0);
    }

    #[test]
    fn test_document_integrity() {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(4096, b' ');
        let cert = CertificateEvidence {
            file_name: "certificate.PDF".into(),
            file_bytes: bytes,
            ..Default::default()
        };
        assert!((document_integrity(&cert).raw_score - 1.0).abs() < 1e-12);

        let mismatched = CertificateEvidence {
            file_name: "certificate.png".into(),
            ..cert.clone()
        };
        assert!((document_integrity(&mismatched).raw_score - 0.8).abs() < 1e-12);

        let junk = CertificateEvidence {
            file_name: "x.bin".into(),
            file_bytes: vec![1, 2, 3],
            ..Default::default()
        };
        assert_eq!(document_integrity(&junk).raw_score, 0.0);
    }

    #[test]
    fn test_content_completeness() {
        let cert = CertificateEvidence {
            title: Some("Rust Fundamentals".into()),
            recipient: Some("  ".into()),
            issued_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!((content_completeness(&cert).raw_score - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_commit_activity_saturates_on_huge_counts() {
        let contributors = [
            Contributor {
                login: "bot".into(),
                contributions: u64::MAX,
            },
            Contributor {
                login: "alice".into(),
                contributions: 1,
            },
        ];
        let eval = commit_activity(&contributors, &cfg());
        assert_eq!(eval.raw_score, 1.0);
        assert!(eval.explanation.starts_with(&u64::MAX.to_string()));
    }

    #[test]
    fn test_directory_named_like_test_is_not_a_test_file() {
        let tree = vec![
            TreeEntry {
                path: "foo_test".into(),
                kind: EntryKind::Tree,
                sha: None,
            },
            TreeEntry {
                path: "main.go".into(),
                kind: EntryKind::Blob,
                sha: None,
            },
        ];
        let inv = FileInventory::from_tree(&tree);
        assert_eq!(inv.test_file_count(), 0);
        assert!(!inv.has_tests());

        let with_file = FileInventory::from_paths(["foo_test.go", "main.go"]);
        assert_eq!(with_file.test_file_count(), 1);
    }

    #[test]
    fn test_age_days_clamps_future() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let past = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let future = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(age_days(past, now), 8);
        assert_eq!(age_days(future, now), 0);
    }
}
