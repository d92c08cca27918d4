// ==========================================
// 农资供应管理系统 - 实体存储层
// ==========================================
// 职责: 内存镜像 + 引用完整性 + 同步/回滚协议
// ==========================================

pub mod entity_store;
pub mod error;

pub use entity_store::{EntitySnapshot, EntityStore, ImportSummary, UNKNOWN_SUPPLIER};
pub use error::{StoreError, StoreResult};
