// ==========================================
// 农资供应管理系统 - 导入导出 API
// ==========================================
// 导出: Store 快照 → <export_dir>/<时间戳>_<kind>.json
// 导入: 读取 → 解析 → 校验 → Store 单批次提交（整体成功或整体失败）
// ==========================================

use crate::api::error::ApiResult;
use crate::api::{lock_store, SharedStore};
use crate::importer::{export_snapshot, import_snapshot, read_snapshot, write_snapshot, EntityKind};
use crate::perf::PerfGuard;
use crate::store::ImportSummary;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Clone)]
pub struct TransferApi {
    store: SharedStore,
    export_dir: PathBuf,
}

impl TransferApi {
    pub fn new(store: SharedStore, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            export_dir: export_dir.into(),
        }
    }

    /// 导出快照
    ///
    /// # 返回
    /// - Ok(PathBuf): 写出的文件路径
    pub fn export(&self, kind: EntityKind) -> ApiResult<PathBuf> {
        let _perf = PerfGuard::new("transfer.export");
        let (snapshot, now) = {
            let store = lock_store(&self.store)?;
            (store.snapshot(), store.clock().now())
        };
        let doc = export_snapshot(&snapshot, kind, now);
        Ok(write_snapshot(&doc, &self.export_dir, kind, &now)?)
    }

    /// 导入快照文件
    ///
    /// # 参数
    /// - path: None 表示用户取消了文件选择
    ///
    /// # 返回
    /// - Err(NoSourceSelected / AccessFailure / MalformedDocument): Store 未改变
    /// - Err(持久化错误): 本地解析成功但提交失败，视为导入失败
    pub fn import_file(&self, path: Option<&Path>) -> ApiResult<ImportSummary> {
        let _perf = PerfGuard::new("transfer.import");
        let doc = read_snapshot(path)?;

        let mut store = lock_store(&self.store)?;
        let incoming = import_snapshot(doc, store.clock().as_ref())?;
        match store.import_batch(incoming) {
            Ok(summary) => {
                info!(records = summary.total(), "导入完成");
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "导入提交失败");
                Err(e.into())
            }
        }
    }
}
