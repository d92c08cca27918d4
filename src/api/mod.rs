// ==========================================
// 农资供应管理系统 - API 层
// ==========================================
// 职责: 展示层（表单/表格/对话框）调用的入口
// 输入: 用户原始文本；输出: 可直接渲染的行/报表
// 并发: 所有 API 共享一个 Store 锁，变更操作串行执行
// ==========================================

pub mod error;
pub mod inventory_api;
pub mod report_api;
pub mod transfer_api;

pub use error::{ApiError, ApiResult};
pub use inventory_api::{InventoryApi, SupplyRow};
pub use report_api::ReportApi;
pub use transfer_api::TransferApi;

use crate::store::EntityStore;
use std::sync::{Arc, Mutex, MutexGuard};

/// 全局唯一的 Store 句柄
pub type SharedStore = Arc<Mutex<EntityStore>>;

/// 获取 Store 锁
pub(crate) fn lock_store(store: &SharedStore) -> ApiResult<MutexGuard<'_, EntityStore>> {
    store
        .lock()
        .map_err(|e| ApiError::InternalError(format!("Store 锁获取失败: {}", e)))
}
