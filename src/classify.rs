//! 领域分类器
//!
//! 优先级固定：显式声明 > 主导语言 > 关键词推断 > `general`。
//! 子领域只来自关键词 (或显式声明的 `domain:subdomain`)。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::evidence::ProjectFile;

pub const FALLBACK_DOMAIN: &str = "general";

/// 子领域至少要命中的关键词数
const SUBDOMAIN_MIN_MATCHES: usize = 2;

/// 语言 (小写) -> 技能领域
const LANGUAGE_DOMAINS: &[(&str, &str)] = &[
    ("python", "python"),
    ("jupyter notebook", "python"),
    ("rust", "rust"),
    ("solidity", "solidity"),
    ("vyper", "solidity"),
    ("go", "go"),
    ("java", "java"),
    ("kotlin", "kotlin"),
    ("javascript", "javascript"),
    ("typescript", "typescript"),
    ("c", "systems"),
    ("c++", "systems"),
    ("cuda", "systems"),
    ("c#", "dotnet"),
    ("ruby", "ruby"),
    ("php", "php"),
    ("swift", "swift"),
    ("dart", "dart"),
    ("html", "web"),
    ("css", "web"),
    ("scss", "web"),
    ("shell", "devops"),
    ("dockerfile", "devops"),
    ("hcl", "devops"),
];

/// 文件扩展名 -> 语言 (用于项目压缩包)
const EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    ("py", "Python"),
    ("ipynb", "Jupyter Notebook"),
    ("rs", "Rust"),
    ("sol", "Solidity"),
    ("vy", "Vyper"),
    ("go", "Go"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("c", "C"),
    ("h", "C"),
    ("cpp", "C++"),
    ("cc", "C++"),
    ("hpp", "C++"),
    ("cu", "CUDA"),
    ("cs", "C#"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("dart", "Dart"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("scss", "SCSS"),
    ("sh", "Shell"),
    ("tf", "HCL"),
];

/// 没有语言信息时 (例如证书) 用关键词推断主领域，按表顺序打破平局
const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("python", &["python", "django", "flask", "pandas", "pytorch"]),
    ("javascript", &["javascript", "react", "node", "nodejs", "vue", "angular"]),
    ("typescript", &["typescript"]),
    ("rust", &["rust", "cargo"]),
    ("solidity", &["solidity", "ethereum", "evm"]),
    ("blockchain", &["blockchain", "algorand", "web3", "defi", "smart"]),
    ("go", &["golang"]),
    ("java", &["java", "spring"]),
    ("cloud", &["aws", "azure", "gcp", "cloud", "kubernetes", "devops"]),
    ("data-science", &["data", "science", "machine", "learning", "analytics"]),
    ("security", &["security", "cybersecurity", "penetration", "ethical"]),
];

const SUBDOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "ml",
        &["tensorflow", "torch", "pytorch", "keras", "model", "models", "dataset", "sklearn", "notebook", "training"],
    ),
    (
        "web",
        &["react", "frontend", "html", "css", "vue", "server", "api", "express", "django", "flask"],
    ),
    (
        "blockchain",
        &["contract", "contracts", "web3", "solidity", "algorand", "ethereum", "hardhat", "truffle", "pyteal"],
    ),
    (
        "devops",
        &["docker", "dockerfile", "kubernetes", "k8s", "terraform", "helm", "ansible"],
    ),
    ("data", &["pandas", "sql", "etl", "analytics", "spark", "airflow"]),
    ("mobile", &["android", "ios", "flutter", "swift", "kotlin"]),
    ("cli", &["cli", "clap", "argparse", "click", "cobra"]),
    ("security", &["crypto", "auth", "security", "vuln", "encryption"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainSource {
    Declared,
    Language,
    Keyword,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDetection {
    pub domain: String,
    pub subdomain: Option<String>,
    pub source: DomainSource,
}

/// 关键词袋：把文件名、topics、标题等切成小写单词
#[derive(Debug, Clone, Default)]
pub struct KeywordBag(BTreeSet<String>);

impl KeywordBag {
    pub fn from_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut bag = BTreeSet::new();
        for text in texts {
            for word in text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
            {
                bag.insert(word.to_lowercase());
            }
        }
        Self(bag)
    }

    fn matches(&self, keywords: &[&str]) -> usize {
        keywords.iter().filter(|kw| self.0.contains(**kw)).count()
    }
}

/// 按固定优先级选出领域和子领域
pub fn classify(
    declared: Option<&str>,
    languages: &BTreeMap<String, u64>,
    bag: &KeywordBag,
) -> DomainDetection {
    // 1. 显式声明
    if let Some(declared) = declared.map(str::trim).filter(|d| !d.is_empty()) {
        let declared = declared.to_lowercase();
        let (domain, declared_sub) = match declared.split_once(':') {
            Some((d, s)) if !s.is_empty() => (d.to_string(), Some(s.to_string())),
            Some((d, _)) => (d.to_string(), None),
            None => (declared.clone(), None),
        };
        let subdomain = declared_sub.or_else(|| infer_subdomain(bag, &domain));
        return DomainDetection {
            domain,
            subdomain,
            source: DomainSource::Declared,
        };
    }

    // 2. 主导语言 -> 3. 关键词 -> 4. 兜底
    let (domain, source) = if let Some(domain) = dominant_language_domain(languages) {
        (domain.to_string(), DomainSource::Language)
    } else if let Some(domain) = best_match(DOMAIN_KEYWORDS, bag, 1) {
        (domain.to_string(), DomainSource::Keyword)
    } else {
        (FALLBACK_DOMAIN.to_string(), DomainSource::Fallback)
    };

    let subdomain = infer_subdomain(bag, &domain);
    DomainDetection {
        domain,
        subdomain,
        source,
    }
}

/// 字节数最多且能映射到领域的语言；平局按语言名排序
pub fn dominant_language_domain(languages: &BTreeMap<String, u64>) -> Option<&'static str> {
    languages
        .iter()
        .filter_map(|(lang, bytes)| language_domain(lang).map(|d| (lang, *bytes, d)))
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(_, _, domain)| domain)
}

pub fn language_domain(language: &str) -> Option<&'static str> {
    let lower = language.to_lowercase();
    LANGUAGE_DOMAINS
        .iter()
        .find(|(lang, _)| *lang == lower)
        .map(|(_, domain)| *domain)
}

/// 按扩展名统计项目里每种语言的字节数
pub fn detect_languages(files: &[ProjectFile]) -> BTreeMap<String, u64> {
    let mut languages = BTreeMap::new();
    for file in files {
        let Some((_, ext)) = file.path.rsplit_once('.') else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if let Some((_, lang)) = EXTENSION_LANGUAGES.iter().find(|(e, _)| *e == ext) {
            *languages.entry(lang.to_string()).or_insert(0) += file.bytes.len() as u64;
        }
    }
    languages
}

fn infer_subdomain(bag: &KeywordBag, domain: &str) -> Option<String> {
    best_match(SUBDOMAIN_KEYWORDS, bag, SUBDOMAIN_MIN_MATCHES)
        .filter(|sub| *sub != domain)
        .map(str::to_string)
}

/// 命中数最多的条目 (≥ min_matches)，平局取表中靠前者
fn best_match(
    table: &[(&'static str, &[&str])],
    bag: &KeywordBag,
    min_matches: usize,
) -> Option<&'static str> {
    let mut best: Option<(&'static str, usize)> = None;
    for (name, keywords) in table {
        let hits = bag.matches(keywords);
        if hits >= min_matches && best.map_or(true, |(_, top)| hits > top) {
            best = Some((*name, hits));
        }
    }
    best.map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(l, b)| (l.to_string(), *b)).collect()
    }

    #[test]
    fn test_declared_domain_wins() {
        let detection = classify(
            Some(" Solidity:DeFi "),
            &langs(&[("Python", 10_000)]),
            &KeywordBag::default(),
        );
        assert_eq!(detection.domain, "solidity");
        assert_eq!(detection.subdomain.as_deref(), Some("defi"));
        assert_eq!(detection.source, DomainSource::Declared);
    }

    #[test]
    fn test_dominant_language_beats_keywords() {
        let bag = KeywordBag::from_texts(["rust cargo", "tensorflow model dataset"]);
        let detection = classify(None, &langs(&[("Python", 9_000), ("Shell", 200)]), &bag);
        assert_eq!(detection.domain, "python");
        assert_eq!(detection.subdomain.as_deref(), Some("ml"));
        assert_eq!(detection.source, DomainSource::Language);
    }

    #[test]
    fn test_unmapped_languages_fall_through() {
        let bag = KeywordBag::from_texts(["Introduction to Algorand Blockchain"]);
        let detection = classify(None, &langs(&[("Brainfuck", 10)]), &bag);
        assert_eq!(detection.domain, "blockchain");
        assert_eq!(detection.source, DomainSource::Keyword);

        let detection = classify(None, &BTreeMap::new(), &KeywordBag::default());
        assert_eq!(detection.domain, FALLBACK_DOMAIN);
        assert_eq!(detection.subdomain, None);
        assert_eq!(detection.source, DomainSource::Fallback);
    }

    #[test]
    fn test_language_tie_is_deterministic() {
        let tie = langs(&[("Rust", 100), ("Go", 100)]);
        assert_eq!(dominant_language_domain(&tie), Some("go"));
    }

    #[test]
    fn test_subdomain_needs_two_hits_and_differs_from_domain() {
        let one_hit = KeywordBag::from_texts(["docker"]);
        assert_eq!(classify(None, &langs(&[("Go", 1)]), &one_hit).subdomain, None);

        let bag = KeywordBag::from_texts(["contracts", "hardhat.config.js"]);
        let detection = classify(Some("blockchain"), &BTreeMap::new(), &bag);
        assert_eq!(detection.subdomain, None);
    }

    #[test]
    fn test_detect_languages_by_extension() {
        let files = vec![
            ProjectFile {
                path: "src/main.rs".into(),
                bytes: vec![0; 300],
            },
            ProjectFile {
                path: "scripts/build.SH".into(),
                bytes: vec![0; 20],
            },
            ProjectFile {
                path: "Makefile".into(),
                bytes: vec![0; 50],
            },
        ];
        let detected = detect_languages(&files);
        assert_eq!(detected, langs(&[("Rust", 300), ("Shell", 20)]));
    }
}
