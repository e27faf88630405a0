//! 技能可信度打分与声誉聚合核心
//!
//! ```text
//! 证据 ──► signals ──► scoring ──► ScoringResult ──► SkillRecord
//!                                                      │ codec::encode
//!                                                      ▼
//!                                         钱包 Box (store / 账本)
//!                                                      │ codec::decode
//!                                                      ▼
//!                                      reputation ──► ReputationProfile
//! ```
//!
//! `codec`、`signals`、`scoring`、`reputation` 都是同步的纯计算，没有 I/O，
//! 可以在任意多个线程上并行调用。`store` 和 `api` 是围绕核心的薄适配层。

pub mod api;
pub mod classify;
pub mod codec;
pub mod config;
pub mod evidence;
pub mod fingerprint;
pub mod record;
pub mod reputation;
pub mod scoring;
pub mod signals;
pub mod store;

pub use codec::{decode, encode, DecodeError, EncodeError};
pub use evidence::{Evidence, EvidenceKind};
pub use record::{CredibilityLevel, SkillRecord};
pub use reputation::{ReputationConfig, ReputationEngine, ReputationProfile};
pub use scoring::{ScoringConfig, ScoringEngine, ScoringError, ScoringResult};
pub use signals::{Signal, SignalName};
