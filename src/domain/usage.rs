// ==========================================
// 农资供应管理系统 - 用量登记领域模型
// ==========================================
// 每次领用生成一条 UsageRecord，同时扣减对应物资的库存
// 不变量: quantity_used > 0; supply_id 必须引用已存在的物资（由 Store 保证）
// ==========================================

use crate::domain::validation::{require_non_empty, ValidationError, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// UsageRecord - 用量记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    pub supply_id: String,
    pub quantity_used: u32,
    /// 使用地块 / 区域
    pub area: String,
    #[serde(with = "crate::identity::timestamp_format")]
    pub used_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        id: impl Into<String>,
        supply_id: &str,
        quantity_used: u32,
        area: &str,
        used_at: DateTime<Utc>,
    ) -> ValidationResult<Self> {
        Ok(Self {
            id: require_non_empty("id", &id.into())?,
            supply_id: require_non_empty("supply_id", supply_id)?,
            quantity_used: require_positive(quantity_used)?,
            area: require_non_empty("area", area)?,
            used_at,
        })
    }

    pub fn normalize(self) -> ValidationResult<Self> {
        Self::new(
            self.id,
            &self.supply_id,
            self.quantity_used,
            &self.area,
            self.used_at,
        )
    }

    pub fn validate(&self) -> ValidationResult<()> {
        require_non_empty("id", &self.id)?;
        require_non_empty("supply_id", &self.supply_id)?;
        require_non_empty("area", &self.area)?;
        require_positive(self.quantity_used)?;
        Ok(())
    }
}

/// 用量登记表单（ID 由 Store 分配，used_at 缺省为当前时间）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUsage {
    pub supply_id: String,
    pub quantity_used: u32,
    pub area: String,
    pub used_at: Option<DateTime<Utc>>,
}

impl NewUsage {
    pub fn new(supply_id: &str, quantity_used: u32, area: &str) -> ValidationResult<Self> {
        Ok(Self {
            supply_id: require_non_empty("supply_id", supply_id)?,
            quantity_used: require_positive(quantity_used)?,
            area: require_non_empty("area", area)?,
            used_at: None,
        })
    }

    pub fn used_at(mut self, at: DateTime<Utc>) -> Self {
        self.used_at = Some(at);
        self
    }
}

fn require_positive(quantity: u32) -> ValidationResult<u32> {
    if quantity == 0 {
        return Err(ValidationError::InvalidQuantity("0".to_string()));
    }
    Ok(quantity)
}
