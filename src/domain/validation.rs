// ==========================================
// 农资供应管理系统 - 输入校验
// ==========================================
// 职责: 邮箱/数量/必填字段校验
// 约束: 校验失败必须在任何状态变更之前返回
// ==========================================

use regex_lite::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// 校验错误（可恢复，直接返回给调用方）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("必填字段为空: {field}")]
    EmptyField { field: &'static str },

    #[error("邮箱地址无效: {0}")]
    InvalidEmail(String),

    #[error("数量必须为非负整数: {0}")]
    InvalidQuantity(String),

    #[error("未知的物资类型: {0}")]
    UnknownSupplyType(String),

    #[error("物资名称 {name} 不在类型 {supply_type} 的允许列表中")]
    NameNotInVocabulary { name: String, supply_type: String },

    #[error("记录 ID 不可修改: expected={expected}, actual={actual}")]
    IdMismatch { expected: String, actual: String },

    #[error("物资不存在: {0}")]
    UnknownSupply(String),

    #[error("库存不足: supply={supply_id}, 现有={available}, 需要={requested}")]
    InsufficientStock {
        supply_id: String,
        available: u32,
        requested: u32,
    },

    #[error("日期无效: {0}")]
    InvalidDate(String),

    #[error("日期区间无效: {start} 晚于 {end}")]
    InvalidDateRange { start: String, end: String },
}

/// Result 类型别名
pub type ValidationResult<T> = Result<T, ValidationError>;

fn email_regex() -> Option<&'static Regex> {
    static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+$").ok())
        .as_ref()
}

/// 邮箱格式检查
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

/// 必填字段检查，返回去除首尾空白后的值
pub fn require_non_empty(field: &'static str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(trimmed.to_string())
}

/// 校验邮箱，返回去除首尾空白后的值
pub fn require_email(value: &str) -> ValidationResult<String> {
    let email = require_non_empty("email", value)?;
    if !is_valid_email(&email) {
        return Err(ValidationError::InvalidEmail(email));
    }
    Ok(email)
}

/// 解析数量输入（仅接受 ASCII 数字）
pub fn parse_quantity(text: &str) -> ValidationResult<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidQuantity(text.to_string()));
    }
    text.parse::<u32>()
        .map_err(|_| ValidationError::InvalidQuantity(text.to_string()))
}

/// 解析日期输入（YYYY-MM-DD）
pub fn parse_date_input(text: &str) -> ValidationResult<chrono::NaiveDate> {
    crate::identity::parse_date(text).ok_or_else(|| ValidationError::InvalidDate(text.trim().to_string()))
}

/// 解析可选日期输入（空文本为 None）
pub fn parse_optional_date(text: &str) -> ValidationResult<Option<chrono::NaiveDate>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_date_input(text).map(Some)
}
