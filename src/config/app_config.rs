// ==========================================
// 农资供应管理系统 - 应用配置
// ==========================================
// 加载顺序（后者覆盖前者）:
//   1. 内置默认值
//   2. JSON 配置文件（显式路径或 AGRI_SUPPLY_CONFIG）
//   3. 环境变量覆盖（无法解析的值记 warn 并忽略）
// ==========================================

use crate::engine::expiry_alert::DEFAULT_EXPIRY_ALERT_DAYS;
use crate::engine::forecast::{
    DEFAULT_FORECAST_WINDOW_DAYS, DEFAULT_GROWTH_RATE_PERCENT, DEFAULT_WASTE_RATE_PERCENT,
};
use crate::engine::stock_alert::DEFAULT_LOW_STOCK_THRESHOLD;
use crate::engine::usage_report::{DEFAULT_DAY_WINDOW_DAYS, DEFAULT_MONTH_WINDOW_DAYS};
use crate::engine::ForecastRates;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// 环境变量名
pub mod config_keys {
    // 配置文件路径
    pub const CONFIG_PATH: &str = "AGRI_SUPPLY_CONFIG";

    // 覆盖项
    pub const BACKEND: &str = "AGRI_SUPPLY_BACKEND";
    pub const DATA_DIR: &str = "AGRI_SUPPLY_DATA_DIR";
    pub const ENFORCE_VOCABULARY: &str = "AGRI_SUPPLY_ENFORCE_VOCABULARY";
    pub const LOW_STOCK_THRESHOLD: &str = "AGRI_SUPPLY_LOW_STOCK_THRESHOLD";
    pub const EXPIRY_ALERT_DAYS: &str = "AGRI_SUPPLY_EXPIRY_ALERT_DAYS";
}

pub const DEFAULT_SQLITE_FILE: &str = "agri_supply.db";
const DATA_DIR_NAME: &str = "agri-supply";
const EXPORT_DIR_NAME: &str = "exports";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("无法读取配置文件 {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("配置文件格式错误 {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("配置值无效 {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// BackendKind - 持久化后端选择
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Csv,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Csv => "csv",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(BackendKind::Csv),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(ConfigError::InvalidValue {
                key: "backend",
                message: format!("未知后端 {}", other),
            }),
        }
    }
}

// ==========================================
// AppConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub data_dir: PathBuf,
    pub sqlite_file: String,
    /// None → <data_dir>/exports
    pub export_dir: Option<PathBuf>,
    pub enforce_vocabulary: bool,
    pub default_growth_rate_percent: f64,
    pub default_waste_rate_percent: f64,
    pub low_stock_threshold: u32,
    /// 临期预警提前天数
    pub expiry_alert_days: u32,
    pub usage_month_window_days: u32,
    pub usage_day_window_days: u32,
    pub forecast_window_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            data_dir: default_data_dir(),
            sqlite_file: DEFAULT_SQLITE_FILE.to_string(),
            export_dir: None,
            enforce_vocabulary: false,
            default_growth_rate_percent: DEFAULT_GROWTH_RATE_PERCENT,
            default_waste_rate_percent: DEFAULT_WASTE_RATE_PERCENT,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            expiry_alert_days: DEFAULT_EXPIRY_ALERT_DAYS,
            usage_month_window_days: DEFAULT_MONTH_WINDOW_DAYS,
            usage_day_window_days: DEFAULT_DAY_WINDOW_DAYS,
            forecast_window_days: DEFAULT_FORECAST_WINDOW_DAYS,
        }
    }
}

/// 默认数据目录: <用户数据目录>/agri-supply，取不到时回退到当前目录
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(DATA_DIR_NAME))
}

impl AppConfig {
    /// 按默认顺序加载（文件路径取自 AGRI_SUPPLY_CONFIG）
    pub fn load() -> ConfigResult<Self> {
        let path = std::env::var(config_keys::CONFIG_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        Self::load_with(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// 显式指定文件与环境变量来源
    ///
    /// # 参数
    /// - path: 配置文件（None 则只用默认值）
    /// - lookup: 环境变量读取函数（测试中可注入）
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup);
        config.validate()?;
        info!(
            backend = %config.backend,
            data_dir = %config.data_dir.display(),
            enforce_vocabulary = config.enforce_vocabulary,
            "配置已加载"
        );
        Ok(config)
    }

    /// 从 JSON 文件读取（缺失字段取默认值）
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 应用环境变量覆盖
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(config_keys::BACKEND) {
            match raw.parse::<BackendKind>() {
                Ok(kind) => self.backend = kind,
                Err(e) => warn!(key = config_keys::BACKEND, value = %raw, error = %e, "忽略无效覆盖"),
            }
        }

        if let Some(raw) = lookup(config_keys::DATA_DIR) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                warn!(key = config_keys::DATA_DIR, "忽略空目录覆盖");
            } else {
                self.data_dir = PathBuf::from(trimmed);
            }
        }

        if let Some(raw) = lookup(config_keys::ENFORCE_VOCABULARY) {
            match parse_flag(&raw) {
                Some(flag) => self.enforce_vocabulary = flag,
                None => warn!(key = config_keys::ENFORCE_VOCABULARY, value = %raw, "忽略无效覆盖"),
            }
        }

        if let Some(raw) = lookup(config_keys::LOW_STOCK_THRESHOLD) {
            match raw.trim().parse::<u32>() {
                Ok(v) => self.low_stock_threshold = v,
                Err(_) => warn!(key = config_keys::LOW_STOCK_THRESHOLD, value = %raw, "忽略无效覆盖"),
            }
        }

        if let Some(raw) = lookup(config_keys::EXPIRY_ALERT_DAYS) {
            match raw.trim().parse::<u32>() {
                Ok(v) => self.expiry_alert_days = v,
                Err(_) => warn!(key = config_keys::EXPIRY_ALERT_DAYS, value = %raw, "忽略无效覆盖"),
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let windows = [
            ("usage_month_window_days", self.usage_month_window_days),
            ("usage_day_window_days", self.usage_day_window_days),
            ("forecast_window_days", self.forecast_window_days),
        ];
        for (key, days) in windows {
            if days == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: "窗口天数必须为正".to_string(),
                });
            }
        }
        ForecastRates::new(self.default_growth_rate_percent, self.default_waste_rate_percent)
            .map_err(|e| ConfigError::InvalidValue {
                key: "default_rates",
                message: e.to_string(),
            })?;
        if self.sqlite_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "sqlite_file",
                message: "不能为空".to_string(),
            });
        }
        Ok(())
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(&self.sqlite_file)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(EXPORT_DIR_NAME))
    }

    pub fn default_rates(&self) -> ForecastRates {
        ForecastRates {
            growth_rate_percent: self.default_growth_rate_percent,
            waste_rate_percent: self.default_waste_rate_percent,
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
