// ==========================================
// 农资供应管理系统 - 导入导出错误类型
// ==========================================
// 约束: 任一导入错误都不会修改 Store（导入整体成功或整体失败）
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    /// 文档结构非法（JSON 语法、字段类型、时间格式等）
    #[error("文档格式错误: {0}")]
    MalformedDocument(String),

    /// 调用方取消了文件选择
    #[error("未选择导入文件")]
    NoSourceSelected,

    /// 其他读写失败
    #[error("文件访问失败 {path}: {message}")]
    AccessFailure { path: String, message: String },
}

impl ImportError {
    pub(crate) fn access(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        ImportError::AccessFailure {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
