// ==========================================
// 农资供应管理系统 - 持久化端口
// ==========================================
// 职责: 隔离具体存储技术（CSV 文件 / 关系数据库）
// 语义: upsert = 主键不存在则插入，存在则整条覆盖
// 原子性: 一次 apply 的全部记录要么全部生效，要么全部不生效
// ==========================================

use crate::domain::{Supplier, Supply, UsageRecord};
use crate::repository::error::RepositoryResult;
use indexmap::IndexMap;

// ==========================================
// WriteBatch - 一次事务提交的写入集合
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub upsert_suppliers: IndexMap<String, Supplier>,
    pub upsert_supplies: IndexMap<String, Supply>,
    pub upsert_usage: IndexMap<String, UsageRecord>,
    pub delete_suppliers: Vec<String>,
    pub delete_supplies: Vec<String>,
    pub delete_usage: Vec<String>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suppliers(mut self, suppliers: IndexMap<String, Supplier>) -> Self {
        self.upsert_suppliers = suppliers;
        self
    }

    pub fn with_supplies(mut self, supplies: IndexMap<String, Supply>) -> Self {
        self.upsert_supplies = supplies;
        self
    }

    pub fn with_usage(mut self, records: IndexMap<String, UsageRecord>) -> Self {
        self.upsert_usage = records;
        self
    }

    pub fn delete_supplier(mut self, id: impl Into<String>) -> Self {
        self.delete_suppliers.push(id.into());
        self
    }

    pub fn delete_supply(mut self, id: impl Into<String>) -> Self {
        self.delete_supplies.push(id.into());
        self
    }

    pub fn delete_usage_record(mut self, id: impl Into<String>) -> Self {
        self.delete_usage.push(id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 批次中的记录总数（用于日志）
    pub fn len(&self) -> usize {
        self.upsert_suppliers.len()
            + self.upsert_supplies.len()
            + self.upsert_usage.len()
            + self.delete_suppliers.len()
            + self.delete_supplies.len()
            + self.delete_usage.len()
    }

    pub fn touches_suppliers(&self) -> bool {
        !self.upsert_suppliers.is_empty() || !self.delete_suppliers.is_empty()
    }

    pub fn touches_supplies(&self) -> bool {
        !self.upsert_supplies.is_empty() || !self.delete_supplies.is_empty()
    }

    pub fn touches_usage(&self) -> bool {
        !self.upsert_usage.is_empty() || !self.delete_usage.is_empty()
    }
}

// ==========================================
// PersistencePort Trait
// ==========================================
// 实现者: CsvRepository, SqliteRepository
// 约束: 实现必须可以从 worker 线程阻塞调用
pub trait PersistencePort: Send + Sync {
    /// 后端名称（用于日志）
    fn backend_name(&self) -> &'static str;

    /// 读取全部供应商（按插入顺序）
    fn fetch_suppliers(&self) -> RepositoryResult<Vec<Supplier>>;

    /// 读取全部物资（按插入顺序）
    fn fetch_supplies(&self) -> RepositoryResult<Vec<Supply>>;

    /// 读取全部用量记录（按插入顺序）
    fn fetch_usage_records(&self) -> RepositoryResult<Vec<UsageRecord>>;

    /// 在一个事务边界内提交整个批次
    ///
    /// 任一记录失败 → 整个批次回滚，后端保持提交前状态。
    fn apply(&self, batch: &WriteBatch) -> RepositoryResult<()>;

    /// 批量 upsert 供应商
    fn upsert_suppliers(&self, suppliers: &IndexMap<String, Supplier>) -> RepositoryResult<()> {
        self.apply(&WriteBatch::new().with_suppliers(suppliers.clone()))
    }

    /// 批量 upsert 物资
    fn upsert_supplies(&self, supplies: &IndexMap<String, Supply>) -> RepositoryResult<()> {
        self.apply(&WriteBatch::new().with_supplies(supplies.clone()))
    }

    /// 批量 upsert 用量记录
    fn upsert_usage_records(&self, records: &IndexMap<String, UsageRecord>) -> RepositoryResult<()> {
        self.apply(&WriteBatch::new().with_usage(records.clone()))
    }
}
