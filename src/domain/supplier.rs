// ==========================================
// 农资供应管理系统 - 供应商领域模型
// ==========================================
// 不变量: id 一经分配不可修改; email 必须通过格式校验
// ==========================================

use crate::domain::validation::{require_email, require_non_empty, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Supplier - 供应商
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(with = "crate::identity::timestamp_format")]
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    /// 构造并校验供应商记录（name/email 去除首尾空白）
    pub fn new(
        id: impl Into<String>,
        name: &str,
        email: &str,
        created_at: DateTime<Utc>,
    ) -> ValidationResult<Self> {
        let id = require_non_empty("id", &id.into())?;
        Ok(Self {
            id,
            name: require_non_empty("name", name)?,
            email: require_email(email)?,
            created_at,
        })
    }

    /// 经构造函数重建（更新、导入的整条记录在进入 Store 前调用）
    pub fn normalize(self) -> ValidationResult<Self> {
        Self::new(self.id, &self.name, &self.email, self.created_at)
    }

    /// 校验已有记录（写入前调用）
    pub fn validate(&self) -> ValidationResult<()> {
        require_non_empty("id", &self.id)?;
        require_non_empty("name", &self.name)?;
        require_email(&self.email)?;
        Ok(())
    }
}

/// 新增供应商的表单数据（ID 与时间戳由 Store 分配）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplier {
    pub name: String,
    pub email: String,
}

impl NewSupplier {
    pub fn new(name: &str, email: &str) -> ValidationResult<Self> {
        Ok(Self {
            name: require_non_empty("name", name)?,
            email: require_email(email)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::ValidationError;
    use crate::identity::{Clock, SystemClock};

    #[test]
    fn test_new_supplier_trims_and_validates() {
        let s = NewSupplier::new("  Green Fields ", "sales@greenfields.com").unwrap();
        assert_eq!(s.name, "Green Fields");

        assert!(matches!(
            NewSupplier::new("Green Fields", "not-an-email"),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            NewSupplier::new("", "a@b.com"),
            Err(ValidationError::EmptyField { field: "name" })
        ));
    }

    #[test]
    fn test_validate_rejects_tampered_record() {
        let mut s = Supplier::new("S1", "Acme", "acme@farm.io", SystemClock.now()).unwrap();
        assert!(s.validate().is_ok());
        s.email = "broken".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_normalize_trims_padded_fields() {
        let mut s = Supplier::new("S1", "Acme", "acme@farm.io", SystemClock.now()).unwrap();
        s.name = "  Acme Farms ".to_string();
        s.email = " sales@acme.io".to_string();
        let s = s.normalize().unwrap();
        assert_eq!(s.name, "Acme Farms");
        assert_eq!(s.email, "sales@acme.io");
    }

    #[test]
    fn test_serde_uses_storage_timestamp() {
        let s = Supplier::new(
            "S1",
            "Acme",
            "acme@farm.io",
            crate::identity::parse_timestamp("2024-02-01 09:00:00").unwrap(),
        )
        .unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["created_at"], "2024-02-01 09:00:00");
    }
}
