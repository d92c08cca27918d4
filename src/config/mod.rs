// ==========================================
// 农资供应管理系统 - 配置层
// ==========================================
// 职责: 应用配置加载（默认值 → JSON 文件 → 环境变量）
// ==========================================

pub mod app_config;

pub use app_config::{
    config_keys, default_data_dir, AppConfig, BackendKind, ConfigError, ConfigResult,
};
