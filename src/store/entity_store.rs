// ==========================================
// 农资供应管理系统 - 实体存储（内存镜像）
// ==========================================
// 职责: 持有 Supplier / Supply / UsageRecord 的有序内存镜像，并与持久化后端保持一致
// 同步协议:
//   1. 保存调用前快照
//   2. 在内存中暂存变更
//   3. 通过 PersistencePort::apply 以单个批次提交
//   4. 提交失败 → 恢复快照并返回错误
//   5. 提交成功 → 从后端整体重新加载（后端为唯一事实来源）
// 并发: 所有变更方法要求 &mut self，多线程访问由调用方加锁串行化
// ==========================================

use crate::domain::{
    NewSupplier, NewSupply, NewUsage, Supplier, Supply, UsageRecord, ValidationError,
};
use crate::identity::{generate_unique_id, Clock};
use crate::perf::PerfGuard;
use crate::repository::{PersistencePort, RepositoryResult, WriteBatch};
use crate::store::error::{StoreError, StoreResult};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 无法解析的供应商显示名
pub const UNKNOWN_SUPPLIER: &str = "Unknown";

// ==========================================
// EntitySnapshot - 某一时刻的完整实体集合
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub suppliers: IndexMap<String, Supplier>,
    pub supplies: IndexMap<String, Supply>,
    pub usage_records: IndexMap<String, UsageRecord>,
}

impl EntitySnapshot {
    pub fn from_records(
        suppliers: Vec<Supplier>,
        supplies: Vec<Supply>,
        usage_records: Vec<UsageRecord>,
    ) -> Self {
        Self {
            suppliers: suppliers
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
            supplies: supplies.into_iter().map(|s| (s.id.clone(), s)).collect(),
            usage_records: usage_records
                .into_iter()
                .map(|u| (u.id.clone(), u))
                .collect(),
        }
    }
}

/// 批量导入结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub suppliers_inserted: usize,
    pub suppliers_updated: usize,
    pub supplies_inserted: usize,
    pub supplies_updated: usize,
    pub usage_inserted: usize,
    pub usage_updated: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.suppliers_inserted
            + self.suppliers_updated
            + self.supplies_inserted
            + self.supplies_updated
            + self.usage_inserted
            + self.usage_updated
    }
}

// ==========================================
// EntityStore
// ==========================================
pub struct EntityStore {
    port: Box<dyn PersistencePort>,
    clock: Arc<dyn Clock>,
    enforce_vocabulary: bool,
    state: EntitySnapshot,
}

impl EntityStore {
    /// 创建 Store 并从后端加载全部数据
    ///
    /// # 参数
    /// - port: 持久化后端
    /// - clock: 时钟（分配 created_at）
    /// - enforce_vocabulary: 是否要求物资名称属于类型词表
    pub fn load(
        port: Box<dyn PersistencePort>,
        clock: Arc<dyn Clock>,
        enforce_vocabulary: bool,
    ) -> StoreResult<Self> {
        let mut store = Self {
            port,
            clock,
            enforce_vocabulary,
            state: EntitySnapshot::default(),
        };
        store.reload()?;
        Ok(store)
    }

    pub fn backend_name(&self) -> &'static str {
        self.port.backend_name()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    // ==========================================
    // 读取
    // ==========================================

    /// 全部供应商（插入顺序）
    pub fn suppliers(&self) -> &IndexMap<String, Supplier> {
        &self.state.suppliers
    }

    /// 全部物资（插入顺序）
    pub fn supplies(&self) -> &IndexMap<String, Supply> {
        &self.state.supplies
    }

    /// 全部用量记录（登记顺序）
    pub fn usage_records(&self) -> &IndexMap<String, UsageRecord> {
        &self.state.usage_records
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        self.state.clone()
    }

    /// 供应商 id → 名称映射
    pub fn supplier_names(&self) -> IndexMap<String, String> {
        self.state
            .suppliers
            .values()
            .map(|s| (s.id.clone(), s.name.clone()))
            .collect()
    }

    /// 按名称查找供应商 id（精确匹配，取第一个）
    pub fn find_supplier_id_by_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.state
            .suppliers
            .values()
            .find(|s| s.name == name)
            .map(|s| s.id.as_str())
    }

    /// 供应商显示名，无法解析时返回 "Unknown"
    pub fn supplier_name(&self, supplier_id: &str) -> &str {
        self.state
            .suppliers
            .get(supplier_id)
            .map(|s| s.name.as_str())
            .unwrap_or(UNKNOWN_SUPPLIER)
    }

    // ==========================================
    // 加载
    // ==========================================

    /// 从后端整体重新加载（失败时内存状态不变）
    pub fn reload(&mut self) -> StoreResult<()> {
        let _perf = PerfGuard::new("store.reload");
        let fresh = self.fetch_all()?;
        self.replace_all(fresh);
        info!(
            backend = self.port.backend_name(),
            suppliers = self.state.suppliers.len(),
            supplies = self.state.supplies.len(),
            usage_records = self.state.usage_records.len(),
            "Store 已从后端加载"
        );
        Ok(())
    }

    /// 整体替换内存状态（不触发持久化）
    pub fn replace_all(&mut self, snapshot: EntitySnapshot) {
        self.state = snapshot;
    }

    fn fetch_all(&self) -> RepositoryResult<EntitySnapshot> {
        let suppliers = self.port.fetch_suppliers()?;
        let supplies = self.port.fetch_supplies()?;
        let usage_records = self.port.fetch_usage_records()?;
        Ok(EntitySnapshot::from_records(suppliers, supplies, usage_records))
    }

    // ==========================================
    // 供应商变更
    // ==========================================

    /// 新增供应商，返回分配的 id
    pub fn add_supplier(&mut self, new: NewSupplier) -> StoreResult<String> {
        let _perf = PerfGuard::new("store.add_supplier");
        let supplier = Supplier::new(generate_unique_id(), &new.name, &new.email, self.clock.now())?;
        let id = supplier.id.clone();

        let mut staged = self.state.clone();
        staged.suppliers.insert(id.clone(), supplier);
        let batch = WriteBatch::new().with_suppliers(staged.suppliers.clone());
        self.sync(staged, batch, "add_supplier")?;

        info!(supplier_id = %id, "供应商已新增");
        Ok(id)
    }

    /// 整条覆盖供应商（id 不可变）
    pub fn update_supplier(&mut self, id: &str, record: Supplier) -> StoreResult<()> {
        let _perf = PerfGuard::new("store.update_supplier");
        self.require_supplier(id)?;
        check_same_id(id, &record.id)?;
        let record = record.normalize()?;

        let mut staged = self.state.clone();
        staged.suppliers.insert(id.to_string(), record);
        let batch = WriteBatch::new().with_suppliers(staged.suppliers.clone());
        self.sync(staged, batch, "update_supplier")?;

        info!(supplier_id = %id, "供应商已更新");
        Ok(())
    }

    /// 删除供应商（仍被物资引用时拒绝）
    pub fn remove_supplier(&mut self, id: &str) -> StoreResult<()> {
        let _perf = PerfGuard::new("store.remove_supplier");
        self.require_supplier(id)?;
        let count = self
            .state
            .supplies
            .values()
            .filter(|s| s.supplier_id == id)
            .count();
        if count > 0 {
            return Err(StoreError::SupplierInUse {
                supplier_id: id.to_string(),
                count,
            });
        }

        let mut staged = self.state.clone();
        staged.suppliers.shift_remove(id);
        let batch = WriteBatch::new()
            .with_suppliers(staged.suppliers.clone())
            .delete_supplier(id);
        self.sync(staged, batch, "remove_supplier")?;

        info!(supplier_id = %id, "供应商已删除");
        Ok(())
    }

    // ==========================================
    // 物资变更
    // ==========================================

    /// 新增物资，供应商按名称解析
    pub fn add_supply(&mut self, new: NewSupply) -> StoreResult<String> {
        let _perf = PerfGuard::new("store.add_supply");
        let supplier_id = self
            .find_supplier_id_by_name(&new.supplier_name)
            .map(str::to_string)
            .ok_or_else(|| StoreError::UnresolvedReference(new.supplier_name.clone()))?;

        let supply = Supply::new(
            generate_unique_id(),
            &new.name,
            new.quantity,
            &supplier_id,
            new.supply_type,
            self.clock.now(),
        )?
        .with_expiration_date(new.expiration_date);
        supply.validate(self.enforce_vocabulary)?;
        let id = supply.id.clone();

        let mut staged = self.state.clone();
        staged.supplies.insert(id.clone(), supply);
        let batch = WriteBatch::new().with_supplies(staged.supplies.clone());
        self.sync(staged, batch, "add_supply")?;

        info!(supply_id = %id, "物资已新增");
        Ok(id)
    }

    /// 整条覆盖物资（id 不可变，supplier_id 必须可解析）
    pub fn update_supply(&mut self, id: &str, record: Supply) -> StoreResult<()> {
        let _perf = PerfGuard::new("store.update_supply");
        self.require_supply(id)?;
        check_same_id(id, &record.id)?;
        let record = record.normalize()?;
        record.validate(self.enforce_vocabulary)?;
        if !self.state.suppliers.contains_key(&record.supplier_id) {
            return Err(StoreError::UnresolvedReference(record.supplier_id));
        }

        let mut staged = self.state.clone();
        staged.supplies.insert(id.to_string(), record);
        let batch = WriteBatch::new().with_supplies(staged.supplies.clone());
        self.sync(staged, batch, "update_supply")?;

        info!(supply_id = %id, "物资已更新");
        Ok(())
    }

    /// 删除物资，连同其用量记录（同一批次）
    pub fn remove_supply(&mut self, id: &str) -> StoreResult<()> {
        let _perf = PerfGuard::new("store.remove_supply");
        self.require_supply(id)?;

        let mut staged = self.state.clone();
        staged.supplies.shift_remove(id);
        let mut batch = WriteBatch::new()
            .with_supplies(staged.supplies.clone())
            .delete_supply(id);

        let cascaded: Vec<String> = staged
            .usage_records
            .values()
            .filter(|u| u.supply_id == id)
            .map(|u| u.id.clone())
            .collect();
        if !cascaded.is_empty() {
            staged.usage_records.retain(|_, u| u.supply_id != id);
            batch = batch.with_usage(staged.usage_records.clone());
            for usage_id in &cascaded {
                batch = batch.delete_usage_record(usage_id.as_str());
            }
        }
        self.sync(staged, batch, "remove_supply")?;

        info!(supply_id = %id, usage_removed = cascaded.len(), "物资已删除");
        Ok(())
    }

    // ==========================================
    // 用量登记
    // ==========================================

    /// 登记一次用量：扣减库存并追加用量记录（同一批次）
    ///
    /// # 返回
    /// - Err(Validation(UnknownSupply)): 物资不存在
    /// - Err(Validation(InsufficientStock)): 库存不足
    pub fn record_usage(&mut self, new: NewUsage) -> StoreResult<String> {
        let _perf = PerfGuard::new("store.record_usage");
        let mut supply = self
            .state
            .supplies
            .get(&new.supply_id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownSupply(new.supply_id.clone()))?;
        if supply.quantity < new.quantity_used {
            return Err(ValidationError::InsufficientStock {
                supply_id: supply.id,
                available: supply.quantity,
                requested: new.quantity_used,
            }
            .into());
        }
        supply.quantity -= new.quantity_used;

        let used_at = new.used_at.unwrap_or_else(|| self.clock.now());
        let record = UsageRecord::new(
            generate_unique_id(),
            &new.supply_id,
            new.quantity_used,
            &new.area,
            used_at,
        )?;
        let id = record.id.clone();
        let remaining = supply.quantity;

        let mut staged = self.state.clone();
        staged.supplies.insert(supply.id.clone(), supply);
        staged.usage_records.insert(id.clone(), record);
        let batch = WriteBatch::new()
            .with_supplies(staged.supplies.clone())
            .with_usage(staged.usage_records.clone());
        self.sync(staged, batch, "record_usage")?;

        info!(usage_id = %id, supply_id = %new.supply_id, remaining, "用量已登记");
        Ok(id)
    }

    // ==========================================
    // 批量导入
    // ==========================================

    /// 合并导入的实体并以单个批次提交
    ///
    /// 全部校验通过后才会写入；写入失败时 Store 与后端均保持导入前状态。
    /// 引用检查只针对文档中出现的记录；导入不扣减库存。
    pub fn import_batch(&mut self, incoming: EntitySnapshot) -> StoreResult<ImportSummary> {
        let _perf = PerfGuard::new("store.import_batch");
        let mut summary = ImportSummary::default();
        let mut staged = self.state.clone();

        for (key, supplier) in incoming.suppliers {
            check_same_id(&key, &supplier.id)?;
            let supplier = supplier.normalize()?;
            match staged.suppliers.insert(supplier.id.clone(), supplier) {
                Some(_) => summary.suppliers_updated += 1,
                None => summary.suppliers_inserted += 1,
            }
        }

        let mut incoming_supplies = Vec::with_capacity(incoming.supplies.len());
        for (key, supply) in incoming.supplies {
            check_same_id(&key, &supply.id)?;
            let supply = supply.normalize()?;
            supply.validate(self.enforce_vocabulary)?;
            incoming_supplies.push(supply.id.clone());
            match staged.supplies.insert(supply.id.clone(), supply) {
                Some(_) => summary.supplies_updated += 1,
                None => summary.supplies_inserted += 1,
            }
        }
        for id in &incoming_supplies {
            let supplier_id = &staged.supplies[id].supplier_id;
            if !staged.suppliers.contains_key(supplier_id) {
                return Err(StoreError::UnresolvedReference(supplier_id.clone()));
            }
        }

        for (key, record) in incoming.usage_records {
            check_same_id(&key, &record.id)?;
            let record = record.normalize()?;
            if !staged.supplies.contains_key(&record.supply_id) {
                return Err(ValidationError::UnknownSupply(record.supply_id).into());
            }
            match staged.usage_records.insert(record.id.clone(), record) {
                Some(_) => summary.usage_updated += 1,
                None => summary.usage_inserted += 1,
            }
        }

        if summary.total() == 0 {
            debug!("导入内容为空，跳过提交");
            return Ok(summary);
        }

        let mut batch = WriteBatch::new();
        if summary.suppliers_inserted + summary.suppliers_updated > 0 {
            batch = batch.with_suppliers(staged.suppliers.clone());
        }
        if summary.supplies_inserted + summary.supplies_updated > 0 {
            batch = batch.with_supplies(staged.supplies.clone());
        }
        if summary.usage_inserted + summary.usage_updated > 0 {
            batch = batch.with_usage(staged.usage_records.clone());
        }
        self.sync(staged, batch, "import_batch")?;

        info!(
            suppliers_inserted = summary.suppliers_inserted,
            suppliers_updated = summary.suppliers_updated,
            supplies_inserted = summary.supplies_inserted,
            supplies_updated = summary.supplies_updated,
            usage_inserted = summary.usage_inserted,
            usage_updated = summary.usage_updated,
            "导入已提交"
        );
        Ok(summary)
    }

    // ==========================================
    // 内部: 同步协议
    // ==========================================

    fn sync(&mut self, staged: EntitySnapshot, batch: WriteBatch, op: &'static str) -> StoreResult<()> {
        let previous = std::mem::replace(&mut self.state, staged);

        if let Err(e) = self.port.apply(&batch) {
            self.state = previous;
            warn!(
                op,
                backend = self.port.backend_name(),
                error = %e,
                "批次提交失败，内存状态已回滚"
            );
            return Err(e.into());
        }

        // 已提交: 以后端为准刷新；刷新失败时暂存状态即已提交状态
        match self.fetch_all() {
            Ok(fresh) => self.state = fresh,
            Err(e) => warn!(op, error = %e, "提交后重新加载失败，保留暂存状态"),
        }
        debug!(op, records = batch.len(), "同步完成");
        Ok(())
    }

    fn require_supplier(&self, id: &str) -> StoreResult<()> {
        if self.state.suppliers.contains_key(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "supplier",
                id: id.to_string(),
            })
        }
    }

    fn require_supply(&self, id: &str) -> StoreResult<()> {
        if self.state.supplies.contains_key(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "supply",
                id: id.to_string(),
            })
        }
    }
}

fn check_same_id(expected: &str, actual: &str) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::IdMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
