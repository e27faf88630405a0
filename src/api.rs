use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::fingerprint;
use crate::record::{join_domain, SkillRecord};
use crate::reputation::{self, ReputationEngine, ReputationProfile, TimelineEvent};
use crate::scoring::{ScoringEngine, ScoringError, ScoringResult};
use crate::store::{RecordStore, StoreError};

// ==========================================
// 1. 应用状态 (Shared State)
// ==========================================
// 两个引擎都是无状态的纯计算，直接共享；RecordStore 内部自带原子写，不需要外层锁。
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub scoring: ScoringEngine,
    pub reputation: ReputationEngine,
}

type ApiError = (StatusCode, String);

// ==========================================
// 2. 数据传输对象 (DTOs)
// ==========================================

// 请求：证据打分
#[derive(Deserialize)]
pub struct ScoreRequest {
    /// "repository" / "certificate" / "project"
    pub kind: String,
    pub metadata: serde_json::Value,
}

// 请求：提交一条技能记录
#[derive(Deserialize)]
pub struct SubmitRequest {
    pub skill_id: String,
    pub score: u64,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    /// 缺省时用 `sha256("{skill_id}:{score}:{timestamp}")`
    #[serde(default)]
    pub artifact_hash: Option<String>,
}

fn default_mode() -> String {
    "ai-graded".to_string()
}

// 响应：提交回执
#[derive(Serialize)]
pub struct SubmitReceipt {
    pub wallet: String,
    pub record: SkillRecord,
    pub record_count: usize,
}

#[derive(Serialize)]
pub struct WalletResponse {
    pub wallet: String,
    pub record_count: usize,
    pub records: Vec<SkillRecord>,
}

#[derive(Serialize)]
pub struct TimelineResponse {
    pub wallet: String,
    pub events: Vec<TimelineEvent>,
}

// ==========================================
// 3. API 路由构建
// ==========================================
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/score", post(score_evidence))
        .route("/records/{wallet}", post(submit_record).get(get_records))
        .route("/reputation/{wallet}", get(get_reputation))
        .route("/timeline/{wallet}", get(get_timeline))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()) // ⚠️ 开发模式：允许所有跨域
        .with_state(state)
}

// ==========================================
// 4. 处理函数 (Handlers)
// ==========================================

async fn health() -> &'static str {
    "ok"
}

/// 接口：证据打分
async fn score_evidence(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoringResult>, ApiError> {
    info!("📥 收到打分请求: kind={}", req.kind);

    // 指纹 + 信号计算属于 CPU 密集型，放到阻塞线程池
    let engine = state.scoring.clone();
    let result = tokio::task::spawn_blocking(move || {
        engine.score_raw(&req.kind, req.metadata, Utc::now())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join error: {}", e)))?
    .map_err(scoring_error)?;

    info!(
        "✅ 打分完成: domain={}, score={:.4}, hash={}",
        result.domain, result.overall_score, result.artifact_hash
    );
    Ok(Json(result))
}

/// 接口：追加一条记录到钱包 Box
async fn submit_record(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitReceipt>, ApiError> {
    let timestamp = Utc::now().timestamp().max(1) as u64;
    let artifact_hash = req.artifact_hash.clone().unwrap_or_else(|| {
        fingerprint::sha256_hex(format!("{}:{}:{}", req.skill_id, req.score, timestamp).as_bytes())
    });

    let record = SkillRecord::new(
        req.mode,
        join_domain(&req.skill_id, req.subdomain.as_deref()),
        req.score,
        artifact_hash,
        timestamp,
    )
    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let record_count = state.store.append(&wallet, &record).map_err(store_error)?;
    info!("✅ 记录已写入: wallet={}, count={}", wallet, record_count);

    Ok(Json(SubmitReceipt {
        wallet,
        record,
        record_count,
    }))
}

/// 接口：读取钱包全部记录
async fn get_records(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let records = state.store.records(&wallet).map_err(store_error)?;
    Ok(Json(WalletResponse {
        wallet,
        record_count: records.len(),
        records,
    }))
}

/// 接口：声誉画像 (每次从完整记录重新计算)
async fn get_reputation(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
) -> Result<Json<ReputationProfile>, ApiError> {
    let records = state.store.records(&wallet).map_err(store_error)?;
    Ok(Json(state.reputation.aggregate(&wallet, &records, Utc::now())))
}

/// 接口：时间线
async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let records = state.store.records(&wallet).map_err(store_error)?;
    Ok(Json(TimelineResponse {
        wallet,
        events: reputation::timeline(&records),
    }))
}

fn scoring_error(e: ScoringError) -> ApiError {
    let status = match e {
        ScoringError::UnsupportedEvidenceKind(_) | ScoringError::InvalidMetadata { .. } => {
            StatusCode::BAD_REQUEST
        }
        ScoringError::InsufficientEvidence(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::EmptyWallet | StoreError::Encode(_) => StatusCode::BAD_REQUEST,
        StoreError::CapacityExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
        StoreError::Decode(_) | StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("存储错误: {}", e);
    }
    (status, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            store: Arc::new(RecordStore::temporary().unwrap()),
            scoring: ScoringEngine::default(),
            reputation: ReputationEngine::default(),
        })
    }

    fn submit(skill_id: &str, score: u64) -> SubmitRequest {
        SubmitRequest {
            skill_id: skill_id.into(),
            score,
            mode: default_mode(),
            subdomain: None,
            artifact_hash: None,
        }
    }

    #[tokio::test]
    async fn test_submit_then_profile() {
        let state = state();
        for score in [70, 80, 90] {
            submit_record(State(state.clone()), Path("W1".into()), Json(submit("python", score)))
                .await
                .unwrap();
        }

        let Json(wallet) = get_records(State(state.clone()), Path("W1".into()))
            .await
            .unwrap();
        assert_eq!(wallet.record_count, 3);
        assert_eq!(wallet.records[0].score, 70);
        assert_eq!(wallet.records[0].artifact_hash.len(), 64);

        let Json(profile) = get_reputation(State(state.clone()), Path("W1".into()))
            .await
            .unwrap();
        assert!(profile.verification_badge);
        assert_eq!(profile.top_domain.as_deref(), Some("python"));

        let Json(timeline) = get_timeline(State(state), Path("W1".into())).await.unwrap();
        assert_eq!(timeline.events.len(), 3);
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_score() {
        let err = submit_record(State(state()), Path("W1".into()), Json(submit("python", 101)))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_score_endpoint_errors() {
        let req = ScoreRequest {
            kind: "video".into(),
            metadata: json!({}),
        };
        let err = score_evidence(State(state()), Json(req)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let req = ScoreRequest {
            kind: "repository".into(),
            metadata: json!({"full_name": "ghost/none"}),
        };
        let err = score_evidence(State(state()), Json(req)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_score_endpoint_success() {
        let req = ScoreRequest {
            kind: "project".into(),
            metadata: json!({
                "name": "demo",
                "files": [
                    {"path": "src/main.rs", "bytes": "666e206d61696e28297b7d"},
                    {"path": "Cargo.toml", "bytes": "5b7061636b6167655d"}
                ]
            }),
        };
        let Json(result) = score_evidence(State(state()), Json(req)).await.unwrap();
        assert_eq!(result.domain, "rust");
        assert!((0.0..=1.0).contains(&result.overall_score));
    }
}
