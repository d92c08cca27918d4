// ==========================================
// 农资供应管理系统 - 持久化层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供 PersistencePort 及其两种适配器（CSV / SQLite）
// 约束: 所有 SQL 使用参数化；所有写入以批次为原子单位
// ==========================================

pub mod csv_repo;
pub mod error;
pub mod port;
pub mod sqlite_repo;

pub use csv_repo::CsvRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use port::{PersistencePort, WriteBatch};
pub use sqlite_repo::SqliteRepository;
