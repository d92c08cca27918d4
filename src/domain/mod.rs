// ==========================================
// 农资供应管理系统 - 领域模型层
// ==========================================
// 职责: 定义实体、类型、字段校验
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod supplier;
pub mod supply;
pub mod types;
pub mod usage;
pub mod validation;

// 重导出核心类型
pub use supplier::{NewSupplier, Supplier};
pub use supply::{NewSupply, Supply};
pub use types::SupplyType;
pub use usage::{NewUsage, UsageRecord};
pub use validation::{ValidationError, ValidationResult};
