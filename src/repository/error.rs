// ==========================================
// 农资供应管理系统 - 持久化层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 后端不可用 / 约束违反 / 部分写入（不变量破坏）
// ==========================================

use rusqlite::ErrorCode;
use thiserror::Error;

/// 持久化层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 可重试错误 =====
    #[error("后端不可用: {0}")]
    BackendUnavailable(String),

    #[error("约束违反: {0}")]
    ConstraintViolation(String),

    // ===== 不变量破坏 =====
    /// 批量写入只完成了一部分，且无法恢复到写入前状态
    #[error("检测到部分写入: {0}")]
    PartialWriteDetected(String),

    // ===== 其他 =====
    #[error("后端锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),
}

impl RepositoryError {
    /// 调用方可以原样重试（引擎本身不自动重试）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RepositoryError::BackendUnavailable(_) | RepositoryError::ConstraintViolation(_)
        )
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, ref msg) => {
                let detail = msg.clone().unwrap_or_else(|| e.to_string());
                match e.code {
                    ErrorCode::ConstraintViolation => RepositoryError::ConstraintViolation(detail),
                    ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::ReadOnly
                    | ErrorCode::DiskFull
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::PermissionDenied => RepositoryError::BackendUnavailable(detail),
                    _ => RepositoryError::DatabaseQueryError(detail),
                }
            }
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..) => {
                RepositoryError::ConstraintViolation(err.to_string())
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::BackendUnavailable(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for RepositoryError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            RepositoryError::BackendUnavailable(err.to_string())
        } else {
            RepositoryError::ConstraintViolation(err.to_string())
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_code_maps_to_constraint_violation() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: supplier.id".to_string()),
        );
        let mapped: RepositoryError = err.into();
        assert!(matches!(mapped, RepositoryError::ConstraintViolation(_)));
        assert!(mapped.is_retryable());
    }

    #[test]
    fn test_busy_maps_to_backend_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(
            RepositoryError::from(err),
            RepositoryError::BackendUnavailable(_)
        ));
    }

    #[test]
    fn test_partial_write_is_not_retryable() {
        assert!(!RepositoryError::PartialWriteDetected("x".into()).is_retryable());
    }
}
