// ==========================================
// 农资供应管理系统 - 核心库
// ==========================================
// 定位: 实体同步与用量分析引擎
// 技术栈: Rust + CSV / SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 标识与时钟
pub mod identity;

// 领域层 - 实体与类型
pub mod domain;

// 持久化层 - PersistencePort 及适配器
pub mod repository;

// SQLite 基础设施（连接初始化/建表）
pub mod db;

// 实体存储 - 内存镜像与同步协议
pub mod store;

// 引擎层 - 用量汇总/预测/预警/用量记录查询
pub mod engine;

// 导入导出
pub mod importer;

// 配置层
pub mod config;

// 日志系统
pub mod logging;

// 性能观测
pub mod perf;

// API 层 - 展示层入口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{Supplier, Supply, SupplyType, UsageRecord, ValidationError};
pub use store::{EntitySnapshot, EntityStore, StoreError};
pub use repository::{CsvRepository, PersistencePort, RepositoryError, SqliteRepository, WriteBatch};
pub use engine::{ExpiryMonitor, Forecaster, LowStockMonitor, UsageAggregator, UsageLog};
pub use api::{ApiError, InventoryApi, ReportApi, TransferApi};
pub use app::AppState;
pub use config::AppConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "农资供应管理系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
