// ==========================================
// 农资供应管理系统 - 低库存预警
// ==========================================
// 规则: quantity <= threshold 即预警（默认阈值 50）
// 输出顺序: 物资插入顺序
// ==========================================

use crate::domain::{Supply, SupplyType};
use crate::store::UNKNOWN_SUPPLIER;
use indexmap::IndexMap;
use serde::Serialize;

pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockAlert {
    pub supply_id: String,
    pub name: String,
    pub supply_type: SupplyType,
    pub quantity: u32,
    pub supplier_name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct LowStockMonitor {
    threshold: u32,
}

impl Default for LowStockMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_STOCK_THRESHOLD)
    }
}

impl LowStockMonitor {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn scan<'a, I>(&self, supplies: I, supplier_names: &IndexMap<String, String>) -> Vec<LowStockAlert>
    where
        I: IntoIterator<Item = &'a Supply>,
    {
        supplies
            .into_iter()
            .filter(|s| s.quantity <= self.threshold)
            .map(|s| LowStockAlert {
                supply_id: s.id.clone(),
                name: s.name.clone(),
                supply_type: s.supply_type,
                quantity: s.quantity,
                supplier_name: supplier_names
                    .get(&s.supplier_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_SUPPLIER.to_string()),
            })
            .collect()
    }
}
