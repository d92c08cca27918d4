// ==========================================
// 农资供应管理系统 - 库存维护 API
// ==========================================
// 职责: 供应商 / 物资的增删改查（表单入口）
// 输入校验: 数量必须为非负整数文本；供应商按名称选择
// 用量登记: 扣减库存，日期文本为空时取当前时间
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{lock_store, SharedStore};
use crate::domain::validation::{parse_date_input, parse_optional_date, parse_quantity};
use crate::domain::{NewSupplier, NewSupply, NewUsage, Supplier, Supply, SupplyType, UsageRecord};
use crate::identity::parse_timestamp;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::instrument;

/// 物资列表行（供应商已解析为名称）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyRow {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub supplier_id: String,
    pub supplier_name: String,
    #[serde(rename = "type")]
    pub supply_type: SupplyType,
    #[serde(with = "crate::identity::timestamp_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::identity::optional_date_format")]
    pub expiration_date: Option<NaiveDate>,
}

// ==========================================
// InventoryApi
// ==========================================
#[derive(Clone)]
pub struct InventoryApi {
    store: SharedStore,
}

impl InventoryApi {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    // ==========================================
    // 供应商
    // ==========================================

    /// 新增供应商
    ///
    /// # 返回
    /// - Ok(String): 新供应商 id
    /// - Err(ApiError::InvalidInput): 名称为空或邮箱格式错误
    #[instrument(skip(self))]
    pub fn add_supplier(&self, name: &str, email: &str) -> ApiResult<String> {
        let new = NewSupplier::new(name, email)?;
        let mut store = lock_store(&self.store)?;
        Ok(store.add_supplier(new)?)
    }

    /// 更新供应商的名称与邮箱（id 与 created_at 保持不变）
    #[instrument(skip(self))]
    pub fn update_supplier(&self, id: &str, name: &str, email: &str) -> ApiResult<()> {
        let mut store = lock_store(&self.store)?;
        let created_at = store
            .suppliers()
            .get(id)
            .map(|s| s.created_at)
            .ok_or_else(|| ApiError::NotFound(format!("supplier(id={})不存在", id)))?;
        let record = Supplier::new(id, name, email, created_at)?;
        Ok(store.update_supplier(id, record)?)
    }

    #[instrument(skip(self))]
    pub fn remove_supplier(&self, id: &str) -> ApiResult<()> {
        let mut store = lock_store(&self.store)?;
        Ok(store.remove_supplier(id)?)
    }

    pub fn list_suppliers(&self) -> ApiResult<Vec<Supplier>> {
        let store = lock_store(&self.store)?;
        Ok(store.suppliers().values().cloned().collect())
    }

    /// 供应商名称列表（下拉框）
    pub fn supplier_names(&self) -> ApiResult<Vec<String>> {
        let store = lock_store(&self.store)?;
        Ok(store.suppliers().values().map(|s| s.name.clone()).collect())
    }

    // ==========================================
    // 物资
    // ==========================================

    /// 新增物资
    ///
    /// # 参数
    /// - quantity_text: 数量文本（仅数字）
    /// - supplier_name: 供应商名称
    /// - type_text: 类型名称（空则为 Other）
    #[instrument(skip(self))]
    pub fn add_supply(
        &self,
        name: &str,
        quantity_text: &str,
        supplier_name: &str,
        type_text: &str,
    ) -> ApiResult<String> {
        let new = NewSupply::new(
            name,
            parse_quantity(quantity_text)?,
            supplier_name,
            parse_supply_type(type_text)?,
        )?;
        let mut store = lock_store(&self.store)?;
        Ok(store.add_supply(new)?)
    }

    /// 整条更新物资（id 与 created_at 保持不变）
    #[instrument(skip(self))]
    pub fn update_supply(
        &self,
        id: &str,
        name: &str,
        quantity_text: &str,
        supplier_name: &str,
        type_text: &str,
    ) -> ApiResult<()> {
        let form = NewSupply::new(
            name,
            parse_quantity(quantity_text)?,
            supplier_name,
            parse_supply_type(type_text)?,
        )?;

        let mut store = lock_store(&self.store)?;
        let created_at = store
            .supplies()
            .get(id)
            .map(|s| s.created_at)
            .ok_or_else(|| ApiError::NotFound(format!("supply(id={})不存在", id)))?;
        let supplier_id = store
            .find_supplier_id_by_name(&form.supplier_name)
            .map(str::to_string)
            .ok_or_else(|| ApiError::ReferenceError(format!("未找到供应商: {}", form.supplier_name)))?;

        let expiration_date = store.supplies().get(id).and_then(|s| s.expiration_date);

        let record = Supply::new(
            id,
            &form.name,
            form.quantity,
            &supplier_id,
            form.supply_type,
            created_at,
        )?
        .with_expiration_date(expiration_date);
        Ok(store.update_supply(id, record)?)
    }

    /// 设置或清除物资到期日
    ///
    /// # 参数
    /// - date_text: `YYYY-MM-DD`，空文本表示清除
    #[instrument(skip(self))]
    pub fn set_expiration_date(&self, id: &str, date_text: &str) -> ApiResult<()> {
        let expiration_date = parse_optional_date(date_text)?;
        let mut store = lock_store(&self.store)?;
        let record = store
            .supplies()
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("supply(id={})不存在", id)))?
            .with_expiration_date(expiration_date);
        Ok(store.update_supply(id, record)?)
    }

    #[instrument(skip(self))]
    pub fn remove_supply(&self, id: &str) -> ApiResult<()> {
        let mut store = lock_store(&self.store)?;
        Ok(store.remove_supply(id)?)
    }

    /// 物资列表（插入顺序）
    pub fn list_supplies(&self) -> ApiResult<Vec<SupplyRow>> {
        let store = lock_store(&self.store)?;
        Ok(store
            .supplies()
            .values()
            .map(|s| SupplyRow {
                id: s.id.clone(),
                name: s.name.clone(),
                quantity: s.quantity,
                supplier_id: s.supplier_id.clone(),
                supplier_name: store.supplier_name(&s.supplier_id).to_string(),
                supply_type: s.supply_type,
                created_at: s.created_at,
                expiration_date: s.expiration_date,
            })
            .collect())
    }

    // ==========================================
    // 用量登记
    // ==========================================

    /// 登记一次用量
    ///
    /// # 参数
    /// - quantity_text: 用量文本（仅数字，必须为正）
    /// - area: 使用区域
    /// - date_text: 使用日期或时间（空则取当前时间）
    ///
    /// # 返回
    /// - Ok(String): 用量记录 id
    /// - Err(ApiError::InvalidInput): 物资不存在、库存不足或输入格式错误
    #[instrument(skip(self))]
    pub fn record_usage(
        &self,
        supply_id: &str,
        quantity_text: &str,
        area: &str,
        date_text: &str,
    ) -> ApiResult<String> {
        let mut new = NewUsage::new(supply_id, parse_quantity(quantity_text)?, area)?;
        if let Some(at) = parse_used_at(date_text)? {
            new = new.used_at(at);
        }
        let mut store = lock_store(&self.store)?;
        Ok(store.record_usage(new)?)
    }

    /// 用量记录（登记顺序）
    pub fn list_usage(&self) -> ApiResult<Vec<UsageRecord>> {
        let store = lock_store(&self.store)?;
        Ok(store.usage_records().values().cloned().collect())
    }

    /// 从后端重新加载
    pub fn reload(&self) -> ApiResult<()> {
        let mut store = lock_store(&self.store)?;
        Ok(store.reload()?)
    }
}

/// 完整时间戳原样使用；只有日期时取当日 00:00:00 UTC
fn parse_used_at(text: &str) -> ApiResult<Option<DateTime<Utc>>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    if let Some(at) = parse_timestamp(text) {
        return Ok(Some(at));
    }
    let date = parse_date_input(text)?;
    Ok(Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))))
}

fn parse_supply_type(text: &str) -> ApiResult<SupplyType> {
    if text.trim().is_empty() {
        return Ok(SupplyType::Other);
    }
    Ok(text.parse::<SupplyType>()?)
}
