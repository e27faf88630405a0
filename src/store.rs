use std::path::Path;

use tracing::debug;

use crate::codec::{self, DecodeError, EncodeError};
use crate::record::SkillRecord;

/// 单个钱包 Box 的默认容量上限 (字节)
pub const DEFAULT_BOX_CAPACITY: usize = 32 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("存储引擎错误: {0}")]
    Storage(#[from] sled::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("钱包地址不能为空")]
    EmptyWallet,
    #[error("钱包 {wallet} 的 Box 容量不足: 需要 {needed} 字节，上限 {capacity} 字节")]
    CapacityExceeded {
        wallet: String,
        needed: usize,
        capacity: usize,
    },
}

/// 记录仓库 (Record Store)
///
/// **职责**: 模拟链上的"每钱包一个 Box"。
/// 每个钱包对应一段字节，内容就是按追加顺序拼接的编码记录，和账本上的格式完全一致。
/// 只追加、不修改、不删除。
///
/// 底层用 sled：嵌入式 KV，写入是原子的，多线程共享 `&self` 即可。
pub struct RecordStore {
    /// 数据库句柄，保留它以便 flush
    db: sled::Db,
    /// wallet -> 拼接后的 Box 字节
    boxes: sled::Tree,
    capacity: usize,
}

impl RecordStore {
    /// 打开 (或创建) 磁盘上的仓库
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// 纯内存仓库，进程退出即丢弃 (测试 / 基准用)
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let boxes = db.open_tree("boxes")?;
        Ok(Self {
            db,
            boxes,
            capacity: DEFAULT_BOX_CAPACITY,
        })
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// 追加一条记录，返回追加后的记录总数
    ///
    /// **并发**: 用 compare-and-swap 循环保证两个并发追加不会互相覆盖。
    pub fn append(&self, wallet: &str, record: &SkillRecord) -> Result<usize, StoreError> {
        let key = wallet_key(wallet)?;
        let encoded = codec::encode(record)?;

        loop {
            let current = self.boxes.get(key)?;
            let old_len = current.as_ref().map_or(0, |v| v.len());
            let needed = old_len + encoded.len();
            if needed > self.capacity {
                return Err(StoreError::CapacityExceeded {
                    wallet: key.to_string(),
                    needed,
                    capacity: self.capacity,
                });
            }

            let mut next = Vec::with_capacity(needed);
            next.extend_from_slice(current.as_deref().unwrap_or(&[]));
            next.extend_from_slice(&encoded);

            match self.boxes.compare_and_swap(key, current, Some(next.as_slice()))? {
                Ok(()) => {
                    let count = codec::count_records(&next)?;
                    debug!(wallet = %key, count, bytes = needed, "记录已追加");
                    return Ok(count);
                }
                // 有人抢先写入，重新读取后再试
                Err(_) => continue,
            }
        }
    }

    /// 钱包 Box 的原始字节；不存在时为空
    pub fn raw(&self, wallet: &str) -> Result<Vec<u8>, StoreError> {
        let key = wallet_key(wallet)?;
        Ok(self
            .boxes
            .get(key)?
            .map(|v| v.to_vec())
            .unwrap_or_default())
    }

    /// 解码后的全部记录 (最旧在前)
    pub fn records(&self, wallet: &str) -> Result<Vec<SkillRecord>, StoreError> {
        Ok(codec::decode(&self.raw(wallet)?)?)
    }

    pub fn record_count(&self, wallet: &str) -> Result<usize, StoreError> {
        Ok(codec::count_records(&self.raw(wallet)?)?)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

fn wallet_key(wallet: &str) -> Result<&str, StoreError> {
    let key = wallet.trim();
    if key.is_empty() {
        return Err(StoreError::EmptyWallet);
    }
    Ok(key)
}
