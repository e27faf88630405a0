use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skillproof_core::{
    api,
    config::Config,
    store::RecordStore,
    ReputationEngine, ScoringEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ----------------------------------------------------------------
    // 0. 加载配置 & 日志
    // ----------------------------------------------------------------
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("LOG_LEVEL 格式错误")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "⚙️  配置加载完成: Host={}:{}, DB={}, 半衰期={}天",
        config.host, config.port, config.db_path, config.reputation.half_life_days
    );

    // ----------------------------------------------------------------
    // 1. 记录仓库 & 引擎
    // ----------------------------------------------------------------
    let store = RecordStore::open(&config.db_path)
        .with_context(|| format!("无法打开记录仓库: {}", config.db_path))?
        .with_capacity(config.box_capacity);
    info!("📚 记录仓库初始化完成");

    let shared_state = Arc::new(api::AppState {
        store: Arc::new(store),
        scoring: ScoringEngine::new(config.scoring.clone()),
        reputation: ReputationEngine::new(config.reputation.clone()),
    });

    // ----------------------------------------------------------------
    // 2. 启动 HTTP 服务
    // ----------------------------------------------------------------
    let app = api::app(shared_state.clone());

    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;

    info!("🚀 API 服务已运行在: http://{}", addr);
    info!("   - POST /score               : 证据打分");
    info!("   - POST /records/{{wallet}}    : 追加技能记录");
    info!("   - GET  /records/{{wallet}}    : 读取解码后的记录");
    info!("   - GET  /reputation/{{wallet}} : 声誉画像");
    info!("   - GET  /timeline/{{wallet}}   : 记录时间线");

    axum::serve(listener, app).await?;

    shared_state.store.flush()?;
    Ok(())
}
