// ==========================================
// 农资供应管理系统 - Store 层错误类型
// ==========================================
// 约束: 任一错误返回时，Store 的可观察状态与调用前一致
// ==========================================

use crate::domain::ValidationError;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// 输入校验失败（写入前拒绝）
    #[error("数据校验失败: {0}")]
    Validation(#[from] ValidationError),

    /// 供应商引用无法解析
    #[error("未找到供应商: {0}")]
    UnresolvedReference(String),

    #[error("{entity} 不存在: id={id}")]
    NotFound { entity: &'static str, id: String },

    /// 供应商仍被物资引用，禁止删除
    #[error("供应商仍被 {count} 条物资引用: id={supplier_id}")]
    SupplierInUse { supplier_id: String, count: usize },

    /// 持久化失败（内存状态已回滚）
    #[error("持久化失败: {0}")]
    Persistence(#[from] RepositoryError),
}

impl StoreError {
    /// 是否可重试（仅后端类错误）
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Persistence(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
