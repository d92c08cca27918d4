// ==========================================
// 农资供应管理系统 - 临期预警
// ==========================================
// 规则: expiration_date <= today + days 即预警（已过期的同样列出）
// 未设置到期日的物资不参与
// 输出顺序: 物资插入顺序
// ==========================================

use crate::domain::Supply;
use crate::store::UNKNOWN_SUPPLIER;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

pub const DEFAULT_EXPIRY_ALERT_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryAlert {
    pub supply_id: String,
    pub name: String,
    pub quantity: u32,
    #[serde(with = "crate::identity::optional_date_format")]
    pub expiration_date: Option<NaiveDate>,
    /// 距到期的天数，已过期为负
    pub days_remaining: i64,
    pub supplier_name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ExpiryMonitor {
    days_ahead: u32,
}

impl Default for ExpiryMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_ALERT_DAYS)
    }
}

impl ExpiryMonitor {
    pub fn new(days_ahead: u32) -> Self {
        Self { days_ahead }
    }

    pub fn scan<'a, I>(
        &self,
        supplies: I,
        supplier_names: &IndexMap<String, String>,
        today: NaiveDate,
    ) -> Vec<ExpiryAlert>
    where
        I: IntoIterator<Item = &'a Supply>,
    {
        supplies
            .into_iter()
            .filter_map(|s| {
                let days_remaining = s.days_until_expiry(today)?;
                (days_remaining <= i64::from(self.days_ahead)).then(|| ExpiryAlert {
                    supply_id: s.id.clone(),
                    name: s.name.clone(),
                    quantity: s.quantity,
                    expiration_date: s.expiration_date,
                    days_remaining,
                    supplier_name: supplier_names
                        .get(&s.supplier_id)
                        .cloned()
                        .unwrap_or_else(|| UNKNOWN_SUPPLIER.to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SupplyType;
    use crate::identity::{parse_date, parse_timestamp};

    fn supply(id: &str, expires: Option<&str>) -> Supply {
        Supply::new(
            id,
            "Fungicide",
            8,
            "S1",
            SupplyType::Pesticides,
            parse_timestamp("2024-05-01 00:00:00").unwrap(),
        )
        .unwrap()
        .with_expiration_date(expires.and_then(parse_date))
    }

    #[test]
    fn test_window_is_inclusive_and_keeps_expired() {
        let today = parse_date("2024-06-30").unwrap();
        let supplies = [
            supply("EXPIRED", Some("2024-06-01")),
            supply("EDGE", Some("2024-07-30")),
            supply("LATER", Some("2024-07-31")),
            supply("UNDATED", None),
        ];
        let mut names = IndexMap::new();
        names.insert("S1".to_string(), "Agro Chem".to_string());

        let alerts = ExpiryMonitor::default().scan(&supplies, &names, today);
        let ids: Vec<&str> = alerts.iter().map(|a| a.supply_id.as_str()).collect();
        assert_eq!(ids, vec!["EXPIRED", "EDGE"]);
        assert_eq!(alerts[0].days_remaining, -29);
        assert_eq!(alerts[1].days_remaining, 30);
        assert_eq!(alerts[1].supplier_name, "Agro Chem");
    }
}
