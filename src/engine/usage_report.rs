// ==========================================
// 农资供应管理系统 - 用量汇总引擎
// ==========================================
// 输入: 全部物资 + 供应商 id→名称映射
// 输出: 五个排序序列
//   - 按类型 / 按物资名称 / 按供应商: 合计降序
//   - 按月（近 90 天）/ 按日（近 30 天）: 时间键降序
// 口径: quantity 作为用量代理值
// 并列: 稳定排序，保留分组键首次出现的顺序
// 窗口: created_at >= now - N 天（含起点）
// ==========================================

use crate::domain::Supply;
use crate::store::UNKNOWN_SUPPLIER;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::instrument;

pub const DEFAULT_MONTH_WINDOW_DAYS: u32 = 90;
pub const DEFAULT_DAY_WINDOW_DAYS: u32 = 30;

const MONTH_KEY_FORMAT: &str = "%Y-%m";
const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// 单个分组的合计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEntry {
    pub key: String,
    pub total: u64,
}

impl UsageEntry {
    pub fn new(key: impl Into<String>, total: u64) -> Self {
        Self {
            key: key.into(),
            total,
        }
    }
}

/// 一次汇总的完整结果（五个视图共享同一个 evaluated_at）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub evaluated_at: DateTime<Utc>,
    pub by_type: Vec<UsageEntry>,
    pub by_supply: Vec<UsageEntry>,
    pub by_supplier: Vec<UsageEntry>,
    pub by_month: Vec<UsageEntry>,
    pub by_day: Vec<UsageEntry>,
}

// ==========================================
// UsageAggregator
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct UsageAggregator {
    month_window_days: u32,
    day_window_days: u32,
}

impl Default for UsageAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MONTH_WINDOW_DAYS, DEFAULT_DAY_WINDOW_DAYS)
    }
}

impl UsageAggregator {
    pub fn new(month_window_days: u32, day_window_days: u32) -> Self {
        Self {
            month_window_days,
            day_window_days,
        }
    }

    /// 计算全部五个视图
    ///
    /// # 参数
    /// - supplies: 物资集合（按插入顺序迭代）
    /// - supplier_names: 供应商 id → 名称
    /// - now: 评估时刻（整个调用只取一次）
    #[instrument(skip(self, supplies, supplier_names))]
    pub fn aggregate<'a, I>(
        &self,
        supplies: I,
        supplier_names: &IndexMap<String, String>,
        now: DateTime<Utc>,
    ) -> UsageReport
    where
        I: IntoIterator<Item = &'a Supply>,
    {
        let month_start = window_start(now, self.month_window_days);
        let day_start = window_start(now, self.day_window_days);

        let mut by_type = IndexMap::new();
        let mut by_supply = IndexMap::new();
        let mut by_supplier = IndexMap::new();
        let mut by_month = IndexMap::new();
        let mut by_day = IndexMap::new();

        for supply in supplies {
            let qty = u64::from(supply.quantity);
            add(&mut by_type, supply.supply_type.as_str(), qty);
            add(&mut by_supply, &supply.name, qty);

            let supplier = supplier_names
                .get(&supply.supplier_id)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_SUPPLIER);
            add(&mut by_supplier, supplier, qty);

            if supply.created_at >= month_start {
                let key = supply.created_at.format(MONTH_KEY_FORMAT).to_string();
                add(&mut by_month, &key, qty);
            }
            if supply.created_at >= day_start {
                let key = supply.created_at.format(DAY_KEY_FORMAT).to_string();
                add(&mut by_day, &key, qty);
            }
        }

        UsageReport {
            evaluated_at: now,
            by_type: rank_by_total(by_type),
            by_supply: rank_by_total(by_supply),
            by_supplier: rank_by_total(by_supplier),
            by_month: sort_by_key_desc(by_month),
            by_day: sort_by_key_desc(by_day),
        }
    }
}

/// 窗口起点（含）
pub(crate) fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(days))
}

fn add(groups: &mut IndexMap<String, u64>, key: &str, qty: u64) {
    match groups.get_mut(key) {
        Some(total) => *total += qty,
        None => {
            groups.insert(key.to_string(), qty);
        }
    }
}

fn into_entries(groups: IndexMap<String, u64>) -> Vec<UsageEntry> {
    groups
        .into_iter()
        .map(|(key, total)| UsageEntry { key, total })
        .collect()
}

/// 合计降序（sort_by 为稳定排序）
fn rank_by_total(groups: IndexMap<String, u64>) -> Vec<UsageEntry> {
    let mut entries = into_entries(groups);
    entries.sort_by(|a, b| b.total.cmp(&a.total));
    entries
}

/// 时间键降序（"YYYY-MM" / "YYYY-MM-DD" 字典序即时间序）
fn sort_by_key_desc(groups: IndexMap<String, u64>) -> Vec<UsageEntry> {
    let mut entries = into_entries(groups);
    entries.sort_by(|a, b| b.key.cmp(&a.key));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SupplyType;
    use crate::identity::parse_timestamp;

    fn supply(id: &str, name: &str, qty: u32, ty: SupplyType, supplier: &str, at: &str) -> Supply {
        Supply::new(id, name, qty, supplier, ty, parse_timestamp(at).unwrap()).unwrap()
    }

    fn names() -> IndexMap<String, String> {
        let mut m = IndexMap::new();
        m.insert("S1".to_string(), "Green Fields".to_string());
        m
    }

    fn now() -> DateTime<Utc> {
        parse_timestamp("2024-06-30 12:00:00").unwrap()
    }

    #[test]
    fn test_by_type_sorted_descending() {
        let d = "2024-06-29 10:00:00";
        let supplies = vec![
            supply("A", "Urea", 10, SupplyType::Fertilizers, "S1", d),
            supply("B", "Potash", 5, SupplyType::Fertilizers, "S1", d),
            supply("C", "Corn", 20, SupplyType::Seeds, "S1", d),
        ];
        let report = UsageAggregator::default().aggregate(&supplies, &names(), now());
        assert_eq!(
            report.by_type,
            vec![UsageEntry::new("Seeds", 20), UsageEntry::new("Fertilizers", 15)]
        );
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let d = "2024-06-29 10:00:00";
        let supplies = vec![
            supply("A", "Wheat", 7, SupplyType::Seeds, "S1", d),
            supply("B", "Barley", 7, SupplyType::Seeds, "S1", d),
            supply("C", "Rice", 9, SupplyType::Seeds, "S1", d),
        ];
        let report = UsageAggregator::default().aggregate(&supplies, &names(), now());
        let keys: Vec<&str> = report.by_supply.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["Rice", "Wheat", "Barley"]);
    }

    #[test]
    fn test_unresolved_supplier_is_unknown() {
        let d = "2024-06-29 10:00:00";
        let supplies = vec![
            supply("A", "Urea", 3, SupplyType::Fertilizers, "S1", d),
            supply("B", "Urea", 4, SupplyType::Fertilizers, "gone", d),
        ];
        let report = UsageAggregator::default().aggregate(&supplies, &names(), now());
        assert_eq!(
            report.by_supplier,
            vec![UsageEntry::new("Unknown", 4), UsageEntry::new("Green Fields", 3)]
        );
    }

    #[test]
    fn test_month_window_boundary() {
        let n = now();
        let mut inside = supply("A", "Corn", 1, SupplyType::Seeds, "S1", "2024-01-01 00:00:00");
        inside.created_at = n - Duration::days(89);
        let mut outside = supply("B", "Corn", 100, SupplyType::Seeds, "S1", "2024-01-01 00:00:00");
        outside.created_at = n - Duration::days(91);

        let report = UsageAggregator::default().aggregate(&[inside, outside], &names(), n);
        let month_total: u64 = report.by_month.iter().map(|e| e.total).sum();
        assert_eq!(month_total, 1);
        // 类型视图不受窗口限制
        assert_eq!(report.by_type[0].total, 101);
    }

    #[test]
    fn test_window_start_is_inclusive() {
        let n = now();
        let mut edge = supply("A", "Corn", 2, SupplyType::Seeds, "S1", "2024-01-01 00:00:00");
        edge.created_at = n - Duration::days(30);
        let report = UsageAggregator::default().aggregate(&[edge], &names(), n);
        assert_eq!(report.by_day, vec![UsageEntry::new("2024-05-31", 2)]);
    }

    #[test]
    fn test_day_buckets_most_recent_first() {
        let supplies = vec![
            supply("A", "Corn", 1, SupplyType::Seeds, "S1", "2024-06-10 09:00:00"),
            supply("B", "Corn", 2, SupplyType::Seeds, "S1", "2024-06-28 09:00:00"),
            supply("C", "Corn", 3, SupplyType::Seeds, "S1", "2024-06-10 18:00:00"),
        ];
        let report = UsageAggregator::default().aggregate(&supplies, &names(), now());
        assert_eq!(
            report.by_day,
            vec![UsageEntry::new("2024-06-28", 2), UsageEntry::new("2024-06-10", 4)]
        );
        assert_eq!(report.by_month, vec![UsageEntry::new("2024-06", 6)]);
    }
}
