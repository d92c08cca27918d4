// ==========================================
// 农资供应管理系统 - 物资领域模型
// ==========================================
// quantity 表示该批物资的现有库存；登记用量时扣减
// 用量汇总/预测仍以每条物资记录的 quantity 作为入库量代理值
// supplier_id 必须引用已存在的供应商（由 Store 在写入时保证）
// expiration_date 可选；用于临期预警
// ==========================================

use crate::domain::types::SupplyType;
use crate::domain::validation::{require_non_empty, ValidationError, ValidationResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Supply - 物资记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub supplier_id: String,
    #[serde(rename = "type")]
    pub supply_type: SupplyType,
    #[serde(with = "crate::identity::timestamp_format")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "crate::identity::optional_date_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<NaiveDate>,
}

impl Supply {
    /// 构造并校验物资记录（id/name/supplier_id 去除首尾空白）
    pub fn new(
        id: impl Into<String>,
        name: &str,
        quantity: u32,
        supplier_id: &str,
        supply_type: SupplyType,
        created_at: DateTime<Utc>,
    ) -> ValidationResult<Self> {
        Ok(Self {
            id: require_non_empty("id", &id.into())?,
            name: require_non_empty("name", name)?,
            quantity,
            supplier_id: require_non_empty("supplier_id", supplier_id)?,
            supply_type,
            created_at,
            expiration_date: None,
        })
    }

    pub fn with_expiration_date(mut self, expiration_date: Option<NaiveDate>) -> Self {
        self.expiration_date = expiration_date;
        self
    }

    /// 经构造函数重建，得到规范化后的记录
    ///
    /// 外部传入的整条记录（更新、导入）在进入 Store 前都走这里，
    /// 保证两种后端看到的是同一个值。
    pub fn normalize(self) -> ValidationResult<Self> {
        let expiration_date = self.expiration_date;
        Ok(Self::new(
            self.id,
            &self.name,
            self.quantity,
            &self.supplier_id,
            self.supply_type,
            self.created_at,
        )?
        .with_expiration_date(expiration_date))
    }

    /// 校验字段
    ///
    /// # 参数
    /// - enforce_vocabulary: 是否要求名称属于类型词表
    pub fn validate(&self, enforce_vocabulary: bool) -> ValidationResult<()> {
        require_non_empty("id", &self.id)?;
        require_non_empty("name", &self.name)?;
        require_non_empty("supplier_id", &self.supplier_id)?;
        check_vocabulary(&self.name, self.supply_type, enforce_vocabulary)
    }

    /// 到期日距 today 的天数（已过期为负）
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiration_date
            .map(|date| date.signed_duration_since(today).num_days())
    }
}

/// 新增物资的表单数据
///
/// 供应商以名称给出，由 Store 解析为 ID。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupply {
    pub name: String,
    pub quantity: u32,
    pub supplier_name: String,
    pub supply_type: SupplyType,
    pub expiration_date: Option<NaiveDate>,
}

impl NewSupply {
    pub fn new(
        name: &str,
        quantity: u32,
        supplier_name: &str,
        supply_type: SupplyType,
    ) -> ValidationResult<Self> {
        Ok(Self {
            name: require_non_empty("name", name)?,
            quantity,
            supplier_name: require_non_empty("supplier", supplier_name)?,
            supply_type,
            expiration_date: None,
        })
    }

    pub fn with_expiration_date(mut self, expiration_date: Option<NaiveDate>) -> Self {
        self.expiration_date = expiration_date;
        self
    }
}

fn check_vocabulary(
    name: &str,
    supply_type: SupplyType,
    enforce_vocabulary: bool,
) -> ValidationResult<()> {
    if enforce_vocabulary && !supply_type.allows(name) {
        return Err(ValidationError::NameNotInVocabulary {
            name: name.to_string(),
            supply_type: supply_type.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Clock, SystemClock};

    fn sample(name: &str, supply_type: SupplyType) -> Supply {
        Supply::new("P1", name, 10, "S1", supply_type, SystemClock.now()).unwrap()
    }

    #[test]
    fn test_vocabulary_only_when_enforced() {
        let supply = sample("Gravel", SupplyType::Seeds);
        assert!(supply.validate(false).is_ok());
        assert!(matches!(
            supply.validate(true),
            Err(ValidationError::NameNotInVocabulary { .. })
        ));
        assert!(sample("Wheat", SupplyType::Seeds).validate(true).is_ok());
    }

    #[test]
    fn test_empty_supplier_rejected() {
        let mut supply = sample("Urea", SupplyType::Fertilizers);
        supply.supplier_id = " ".to_string();
        assert!(matches!(
            supply.validate(false),
            Err(ValidationError::EmptyField { field: "supplier_id" })
        ));
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(sample("Urea", SupplyType::Fertilizers)).unwrap();
        assert_eq!(json["type"], "Fertilizers");
        assert_eq!(json["supplier_id"], "S1");
        assert!(json.get("expiration_date").is_none());

        let dated = sample("Urea", SupplyType::Fertilizers)
            .with_expiration_date(NaiveDate::from_ymd_opt(2024, 9, 1));
        let json = serde_json::to_value(dated).unwrap();
        assert_eq!(json["expiration_date"], "2024-09-01");
    }

    #[test]
    fn test_constructor_trims_and_rejects_blank() {
        let s = Supply::new(" P1 ", "  Corn ", 3, " S1", SupplyType::Seeds, SystemClock.now()).unwrap();
        assert_eq!(s.id, "P1");
        assert_eq!(s.name, "Corn");
        assert_eq!(s.supplier_id, "S1");
        assert!(matches!(
            Supply::new("P1", "   ", 3, "S1", SupplyType::Seeds, SystemClock.now()),
            Err(ValidationError::EmptyField { field: "name" })
        ));
    }

    #[test]
    fn test_normalize_keeps_expiration_date() {
        let mut raw = sample("Corn", SupplyType::Seeds)
            .with_expiration_date(NaiveDate::from_ymd_opt(2025, 1, 31));
        raw.name = "\tCorn  ".to_string();
        let normalized = raw.normalize().unwrap();
        assert_eq!(normalized.name, "Corn");
        assert_eq!(normalized.expiration_date, NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn test_days_until_expiry() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let s = sample("Corn", SupplyType::Seeds);
        assert_eq!(s.days_until_expiry(today), None);
        let s = s.with_expiration_date(NaiveDate::from_ymd_opt(2024, 6, 28));
        assert_eq!(s.days_until_expiry(today), Some(-2));
    }
}
