//! 记录编解码 (Record Codec)
//!
//! 钱包 Box 中保存的是若干条记录的顺序拼接，没有单独的计数字段：
//!
//! ```text
//! [2B BE 长度][长度字节: SkillRecord 结构体] [2B BE 长度][...] ...
//! ```
//!
//! 单条结构体布局 (偏移量从结构体起点算起)：
//!
//! ```text
//!  0..2   mode 字符串偏移
//!  2..4   domain 字符串偏移
//!  4..12  score (u64 BE)
//! 12..14  artifact_hash 字符串偏移
//! 14..22  timestamp (u64 BE)
//! 22..    三个字符串，每个都是 [2B BE 长度][UTF-8 字节]
//! ```

use crate::record::{RecordError, SkillRecord, MAX_SCORE};

/// 结构体固定头部大小
pub const HEAD_SIZE: usize = 22;

/// 长度前缀大小
const LEN_PREFIX: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("记录不合法: {0}")]
    InvalidRecord(#[from] RecordError),
    #[error("字段 {field} 长度 {len} 超出 16 位长度上限")]
    FieldTooLong { field: &'static str, len: usize },
    #[error("编码后的记录长度 {0} 超出 16 位长度上限")]
    RecordTooLarge(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// 剩余字节不足以容纳声明的长度
    #[error("记录被截断: 偏移 {offset} 处需要 {needed} 字节，仅剩 {remaining} 字节")]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    /// 字段偏移越出结构体边界
    #[error("字段 {field} 的偏移 {offset} 越界 (结构体长度 {len})")]
    InvalidOffset {
        field: &'static str,
        offset: usize,
        len: usize,
    },
    #[error("字段 {field} 不是合法的 UTF-8: {source}")]
    Utf8Decode {
        field: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("字段 {field} 的值 {value} 超出允许范围")]
    FieldBounds { field: &'static str, value: u64 },
}

/// 编码单条记录，返回带 2 字节长度前缀的完整块
pub fn encode(record: &SkillRecord) -> Result<Vec<u8>, EncodeError> {
    record.validate()?;

    let strings: [(&'static str, &str); 3] = [
        ("mode", &record.mode),
        ("domain", &record.domain),
        ("artifact_hash", &record.artifact_hash),
    ];

    // 1. 计算每个字符串的偏移
    let mut offsets = [0u16; 3];
    let mut cursor = HEAD_SIZE;
    for (slot, &(field, value)) in offsets.iter_mut().zip(strings.iter()) {
        if value.len() > u16::MAX as usize {
            return Err(EncodeError::FieldTooLong {
                field,
                len: value.len(),
            });
        }
        *slot = u16::try_from(cursor).map_err(|_| EncodeError::RecordTooLarge(cursor))?;
        cursor += LEN_PREFIX + value.len();
    }
    let struct_len = u16::try_from(cursor).map_err(|_| EncodeError::RecordTooLarge(cursor))?;

    // 2. 写入: 长度前缀 + 头部 + 字符串区
    let mut out = Vec::with_capacity(LEN_PREFIX + cursor);
    out.extend_from_slice(&struct_len.to_be_bytes());
    out.extend_from_slice(&offsets[0].to_be_bytes());
    out.extend_from_slice(&offsets[1].to_be_bytes());
    out.extend_from_slice(&(record.score as u64).to_be_bytes());
    out.extend_from_slice(&offsets[2].to_be_bytes());
    out.extend_from_slice(&record.timestamp.to_be_bytes());
    for (_, value) in strings {
        // 上面已确认不超过 u16::MAX
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        out.extend_from_slice(value.as_bytes());
    }

    Ok(out)
}

/// 按顺序编码多条记录，等价于逐条 `encode` 后拼接
pub fn encode_all<'a, I>(records: I) -> Result<Vec<u8>, EncodeError>
where
    I: IntoIterator<Item = &'a SkillRecord>,
{
    let mut blob = Vec::new();
    for record in records {
        append(&mut blob, record)?;
    }
    Ok(blob)
}

/// 把一条记录追加到已有的 Box 数据末尾
pub fn append(blob: &mut Vec<u8>, record: &SkillRecord) -> Result<(), EncodeError> {
    let encoded = encode(record)?;
    blob.extend_from_slice(&encoded);
    Ok(())
}

/// 解码整个 Box 数据，按追加顺序 (最旧在前) 返回所有记录
///
/// 任何一条记录出错都会让整次解码失败，不返回部分结果。
pub fn decode(bytes: &[u8]) -> Result<Vec<SkillRecord>, DecodeError> {
    let mut records = Vec::new();
    for frame in frames(bytes) {
        records.push(decode_struct(frame?)?);
    }
    Ok(records)
}

/// 只遍历长度前缀来统计记录条数，不解析结构体内容
pub fn count_records(bytes: &[u8]) -> Result<usize, DecodeError> {
    frames(bytes).try_fold(0usize, |count, frame| frame.map(|_| count + 1))
}

/// 解码一个不带长度前缀的结构体
pub fn decode_struct(rec: &[u8]) -> Result<SkillRecord, DecodeError> {
    if rec.len() < HEAD_SIZE {
        return Err(DecodeError::TruncatedRecord {
            offset: 0,
            needed: HEAD_SIZE,
            remaining: rec.len(),
        });
    }

    let mode_offset = read_u16(rec, 0) as usize;
    let domain_offset = read_u16(rec, 2) as usize;
    let score = read_u64(rec, 4);
    let artifact_offset = read_u16(rec, 12) as usize;
    let timestamp = read_u64(rec, 14);

    if score > MAX_SCORE as u64 {
        return Err(DecodeError::FieldBounds {
            field: "score",
            value: score,
        });
    }

    Ok(SkillRecord {
        mode: read_string(rec, "mode", mode_offset)?,
        domain: read_string(rec, "domain", domain_offset)?,
        score: score as u8,
        artifact_hash: read_string(rec, "artifact_hash", artifact_offset)?,
        timestamp,
    })
}

/// 逐个切出 `[2B 长度][长度字节]` 帧
fn frames(bytes: &[u8]) -> impl Iterator<Item = Result<&[u8], DecodeError>> + '_ {
    let mut offset = 0usize;
    let mut failed = false;
    std::iter::from_fn(move || {
        if failed || offset >= bytes.len() {
            return None;
        }
        let remaining = bytes.len() - offset;
        if remaining < LEN_PREFIX {
            failed = true;
            return Some(Err(DecodeError::TruncatedRecord {
                offset,
                needed: LEN_PREFIX,
                remaining,
            }));
        }
        let declared = read_u16(bytes, offset) as usize;
        let body_start = offset + LEN_PREFIX;
        if body_start + declared > bytes.len() {
            failed = true;
            return Some(Err(DecodeError::TruncatedRecord {
                offset: body_start,
                needed: declared,
                remaining: bytes.len() - body_start,
            }));
        }
        offset = body_start + declared;
        Some(Ok(&bytes[body_start..offset]))
    })
}

fn read_string(rec: &[u8], field: &'static str, offset: usize) -> Result<String, DecodeError> {
    let invalid = || DecodeError::InvalidOffset {
        field,
        offset,
        len: rec.len(),
    };

    // 字符串只能落在头部之后
    if offset < HEAD_SIZE || offset + LEN_PREFIX > rec.len() {
        return Err(invalid());
    }
    let str_len = read_u16(rec, offset) as usize;
    let start = offset + LEN_PREFIX;
    let end = start + str_len;
    if end > rec.len() {
        return Err(invalid());
    }

    std::str::from_utf8(&rec[start..end])
        .map(str::to_owned)
        .map_err(|source| DecodeError::Utf8Decode { field, source })
}

// 调用方保证 `at + 2 <= buf.len()`
fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

// 调用方保证 `at + 8 <= buf.len()`
fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    u64::from_be_bytes(raw)
}
