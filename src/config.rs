use anyhow::Context;
use std::env;
use std::str::FromStr;

use crate::reputation::ReputationConfig;
use crate::scoring::ScoringConfig;
use crate::store::DEFAULT_BOX_CAPACITY;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub log_level: String,
    /// 单个钱包 Box 的字节上限
    pub box_capacity: usize,
    pub scoring: ScoringConfig,
    pub reputation: ReputationConfig,
}

impl Config {
    /// 从环境变量加载；格式错误直接报错，不做静默回退
    pub fn from_env() -> anyhow::Result<Self> {
        let mut reputation = ReputationConfig::default();
        reputation.half_life_days = parse_var("DECAY_HALF_LIFE_DAYS", reputation.half_life_days)?;
        anyhow::ensure!(
            reputation.half_life_days > 0.0,
            "DECAY_HALF_LIFE_DAYS 必须大于 0"
        );

        let mut scoring = ScoringConfig::default();
        scoring.verified_threshold = parse_var("VERIFIED_THRESHOLD", scoring.verified_threshold)?;
        anyhow::ensure!(
            (0.0..=1.0).contains(&scoring.verified_threshold),
            "VERIFIED_THRESHOLD 必须在 0 到 1 之间"
        );

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 3000)?,
            db_path: env::var("DB_PATH").unwrap_or_else(|_| "data/db/records".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            box_capacity: parse_var("BOX_CAPACITY", DEFAULT_BOX_CAPACITY)?,
            scoring,
            reputation,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} 格式错误: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
