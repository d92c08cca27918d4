// ==========================================
// 农资供应管理系统 - 应用状态
// ==========================================
// 职责: 按配置装配 后端 → Store → API
// 并发: 所有 API 共享同一个 Arc<Mutex<EntityStore>>
// ==========================================

use crate::api::{ApiError, ApiResult, InventoryApi, ReportApi, SharedStore, TransferApi};
use crate::config::{AppConfig, BackendKind};
use crate::identity::{Clock, SystemClock};
use crate::repository::{
    CsvRepository, PersistencePort, RepositoryError, RepositoryResult, SqliteRepository,
};
use crate::store::EntityStore;
use std::sync::{Arc, Mutex};
use tracing::info;

/// 应用状态
///
/// 包含配置、共享 Store 与全部 API 实例
pub struct AppState {
    pub config: AppConfig,

    /// 唯一的 Store（全局锁串行化所有变更）
    pub store: SharedStore,

    /// 库存维护 API
    pub inventory_api: Arc<InventoryApi>,

    /// 报表 API
    pub report_api: Arc<ReportApi>,

    /// 导入导出 API
    pub transfer_api: Arc<TransferApi>,
}

impl AppState {
    /// 使用系统时钟创建应用状态
    pub fn new(config: AppConfig) -> ApiResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 使用指定时钟创建应用状态
    ///
    /// # 返回
    /// - Err: 后端无法打开或初始加载失败
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> ApiResult<Self> {
        let port = open_backend(&config)?;
        let store = EntityStore::load(port, clock, config.enforce_vocabulary)?;
        info!(
            backend = store.backend_name(),
            suppliers = store.suppliers().len(),
            supplies = store.supplies().len(),
            "应用状态初始化完成"
        );

        let store: SharedStore = Arc::new(Mutex::new(store));
        Ok(Self {
            inventory_api: Arc::new(InventoryApi::new(Arc::clone(&store))),
            report_api: Arc::new(ReportApi::new(Arc::clone(&store), &config)),
            transfer_api: Arc::new(TransferApi::new(Arc::clone(&store), config.export_dir())),
            store,
            config,
        })
    }
}

/// 按配置打开持久化后端
pub fn open_backend(config: &AppConfig) -> RepositoryResult<Box<dyn PersistencePort>> {
    std::fs::create_dir_all(&config.data_dir).map_err(|e| {
        RepositoryError::BackendUnavailable(format!(
            "无法创建数据目录 {}: {}",
            config.data_dir.display(),
            e
        ))
    })?;

    let port: Box<dyn PersistencePort> = match config.backend {
        BackendKind::Csv => Box::new(CsvRepository::new(&config.data_dir)?),
        BackendKind::Sqlite => {
            let path = config.sqlite_path();
            Box::new(SqliteRepository::new(&path.to_string_lossy())?)
        }
    };
    info!(backend = config.backend.as_str(), "持久化后端已打开");
    Ok(port)
}

/// 在 tokio 阻塞线程池中执行一次 API 调用
///
/// 一致性语义与同步调用相同（Store 锁仍在 API 内部获取）。
pub async fn spawn_api_call<A, T, F>(api: Arc<A>, op: &'static str, f: F) -> ApiResult<T>
where
    A: Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&A) -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new(op);
        f(&api)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("任务执行失败: {}", e)))?
}
