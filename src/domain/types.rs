// ==========================================
// 农资供应管理系统 - 领域类型定义
// ==========================================
// 物资类型为枚举，每种类型有固定的名称词表
// Other 不受词表约束
// ==========================================

use crate::domain::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 物资类型 (Supply Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SupplyType {
    Fertilizers, // 肥料
    Seeds,       // 种子
    Pesticides,  // 农药
    #[default]
    Other,       // 其他（不受词表约束）
}

const FERTILIZER_NAMES: &[&str] = &["Nitrogen", "Phosphate", "Potash", "Urea", "Compost"];
const SEED_NAMES: &[&str] = &["Corn", "Wheat", "Soybean", "Rice", "Barley"];
const PESTICIDE_NAMES: &[&str] = &["Herbicide", "Insecticide", "Fungicide"];

impl SupplyType {
    /// 全部类型（用于下拉框）
    pub const ALL: [SupplyType; 4] = [
        SupplyType::Fertilizers,
        SupplyType::Seeds,
        SupplyType::Pesticides,
        SupplyType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyType::Fertilizers => "Fertilizers",
            SupplyType::Seeds => "Seeds",
            SupplyType::Pesticides => "Pesticides",
            SupplyType::Other => "Other",
        }
    }

    /// 该类型允许的名称词表；None 表示不受约束
    pub fn allowed_names(&self) -> Option<&'static [&'static str]> {
        match self {
            SupplyType::Fertilizers => Some(FERTILIZER_NAMES),
            SupplyType::Seeds => Some(SEED_NAMES),
            SupplyType::Pesticides => Some(PESTICIDE_NAMES),
            SupplyType::Other => None,
        }
    }

    /// 名称是否属于该类型的词表（忽略大小写）
    pub fn allows(&self, name: &str) -> bool {
        match self.allowed_names() {
            Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name.trim())),
            None => true,
        }
    }
}

impl fmt::Display for SupplyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupplyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        SupplyType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| ValidationError::UnknownSupplyType(raw.to_string()))
    }
}
