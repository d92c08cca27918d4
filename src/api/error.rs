// ==========================================
// 农资供应管理系统 - API 层错误类型
// ==========================================
// 职责: 将各层错误统一为展示层可理解的错误
// 约束: 写入失败一律向调用方返回，不吞错误；引擎不自动重试
// ==========================================

use crate::config::ConfigError;
use crate::domain::ValidationError;
use crate::engine::ForecastError;
use crate::importer::ImportError;
use crate::repository::RepositoryError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误（写入前拒绝）
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("引用错误: {0}")]
    ReferenceError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效比率: {0}")]
    InvalidRate(String),

    // ==========================================
    // 持久化错误（已回滚）
    // ==========================================
    #[error("后端不可用: {0}")]
    BackendUnavailable(String),

    #[error("约束冲突: {0}")]
    ConstraintViolation(String),

    #[error("检测到部分写入: {0}")]
    PartialWriteDetected(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文档格式错误: {0}")]
    MalformedDocument(String),

    #[error("未选择导入文件")]
    NoSourceSelected,

    #[error("文件访问失败: {0}")]
    AccessFailure(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否建议调用方重试（引擎本身不重试）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::BackendUnavailable(_) | ApiError::ConstraintViolation(_)
        )
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::BackendUnavailable(msg) => ApiError::BackendUnavailable(msg),
            RepositoryError::ConstraintViolation(msg) => ApiError::ConstraintViolation(msg),
            RepositoryError::PartialWriteDetected(msg) => ApiError::PartialWriteDetected(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => e.into(),
            StoreError::UnresolvedReference(name) => {
                ApiError::ReferenceError(format!("未找到供应商: {}", name))
            }
            e @ StoreError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            e @ StoreError::SupplierInUse { .. } => ApiError::BusinessRuleViolation(e.to_string()),
            StoreError::Persistence(e) => e.into(),
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        ApiError::InvalidRate(err.to_string())
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MalformedDocument(msg) => ApiError::MalformedDocument(msg),
            ImportError::NoSourceSelected => ApiError::NoSourceSelected,
            e @ ImportError::AccessFailure { .. } => ApiError::AccessFailure(e.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_api_taxonomy() {
        let err: ApiError = StoreError::UnresolvedReference("Nobody".to_string()).into();
        assert!(matches!(err, ApiError::ReferenceError(_)));
        assert!(!err.is_retryable());

        let err: ApiError =
            StoreError::Persistence(RepositoryError::BackendUnavailable("disk".to_string())).into();
        assert!(matches!(err, ApiError::BackendUnavailable(_)));
        assert!(err.is_retryable());

        let err: ApiError = StoreError::Validation(ValidationError::InvalidQuantity("x".to_string())).into();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
