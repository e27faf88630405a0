use sha2::{Digest, Sha256}; // 引入 SHA2 算法和 Digest 特性(方法集)

use crate::evidence::{
    CertificateEvidence, EntryKind, Evidence, ProjectEvidence, RepositoryEvidence,
};

/// 计算证据的 `artifact_hash`
///
/// **要求**: 相同的证据必须永远得到相同的哈希，与字段顺序、文件列举顺序无关。
/// 所以这里先把证据压成一段"规范字节"(canonical bytes)，再整体做 SHA-256。
pub fn artifact_hash(evidence: &Evidence) -> String {
    let mut hasher = Sha256::new();
    match evidence {
        Evidence::Repository(repo) => feed_repository(&mut hasher, repo),
        Evidence::Certificate(cert) => feed_certificate(&mut hasher, cert),
        Evidence::Project(project) => feed_project(&mut hasher, project),
    }
    // `{:x}` 输出小写 Hex，长度固定 64
    format!("{:x}", hasher.finalize())
}

/// 任意字节的 SHA-256 (小写 Hex)
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// 仓库：文件树清单 (按路径排序)
///
/// 每个条目写入 `type \0 len(path) path len(sha) sha`，长度为 u64 BE。
/// 拿不到文件树时退化为仓库全名，这样同一个仓库在同一状态下仍然得到同一个哈希。
fn feed_repository(hasher: &mut Sha256, repo: &RepositoryEvidence) {
    hasher.update(b"repository\n");
    feed_framed(hasher, repo.full_name.as_bytes());

    let Some(tree) = &repo.tree else {
        return;
    };
    let mut entries: Vec<_> = tree.iter().collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));

    for entry in entries {
        let kind = match entry.kind {
            EntryKind::Blob => "blob",
            EntryKind::Tree => "tree",
        };
        hasher.update(kind.as_bytes());
        hasher.update([0u8]);
        feed_framed(hasher, entry.path.as_bytes());
        feed_framed(hasher, entry.sha.as_deref().unwrap_or("").as_bytes());
    }
}

/// `len(u64 BE) bytes`
fn feed_framed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// 证书：只看文件字节本身，文件名不参与
fn feed_certificate(hasher: &mut Sha256, cert: &CertificateEvidence) {
    hasher.update(&cert.file_bytes);
}

/// 项目：压缩包内容按路径排序后依次写入 `path \0 len(u64 BE) bytes`
///
/// 长度前缀保证 "a"+"bc" 与 "ab"+"c" 不会拼出同一段字节。
fn feed_project(hasher: &mut Sha256, project: &ProjectEvidence) {
    let mut files: Vec<_> = project.files.iter().collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    for file in files {
        hasher.update(file.path.as_bytes());
        hasher.update([0u8]);
        feed_framed(hasher, &file.bytes);
    }
}
