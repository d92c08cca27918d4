// ==========================================
// 农资供应管理系统 - 分析引擎层
// ==========================================
// 职责: 基于 Store 的只读数据计算报表
// 红线: 引擎不访问持久化层，不修改实体
// ==========================================

pub mod expiry_alert;
pub mod forecast;
pub mod stock_alert;
pub mod usage_log;
pub mod usage_report;

pub use expiry_alert::{ExpiryAlert, ExpiryMonitor};
pub use forecast::{ForecastError, ForecastRates, ForecastResult, Forecaster, SupplyForecast};
pub use stock_alert::{LowStockAlert, LowStockMonitor};
pub use usage_log::{AreaUsageAverage, DateRange, UsageEvent, UsageLog};
pub use usage_report::{UsageAggregator, UsageEntry, UsageReport};
