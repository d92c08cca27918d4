// ==========================================
// 农资供应管理系统 - 用量记录查询
// ==========================================
// 基于 UsageRecord 日志的三类查询:
//   - 按区域的用量历史
//   - 日期区间内的用量明细（起止日期均包含，按 UTC 日期比较）
//   - 某物资在某区域的平均单次用量
// 输出顺序: 登记顺序
// ==========================================

use crate::domain::{Supply, UsageRecord, ValidationError, ValidationResult};
use crate::identity::format_date;
use crate::store::UNKNOWN_SUPPLIER;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::instrument;

/// 一条可展示的用量记录（物资已解析为名称）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEvent {
    pub usage_id: String,
    pub supply_id: String,
    pub supply_name: String,
    pub quantity_used: u32,
    pub area: String,
    #[serde(with = "crate::identity::timestamp_format")]
    pub used_at: DateTime<Utc>,
}

/// 平均单次用量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaUsageAverage {
    pub supply_name: String,
    pub area: String,
    pub events: usize,
    pub total_used: u64,
    pub average_per_event: f64,
}

/// 日期区间（含两端）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ValidationResult<Self> {
        if start > end {
            return Err(ValidationError::InvalidDateRange {
                start: format_date(&start),
                end: format_date(&end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start <= day && day <= self.end
    }
}

// ==========================================
// UsageLog - 只读视图
// ==========================================
pub struct UsageLog<'a> {
    records: &'a IndexMap<String, UsageRecord>,
    supplies: &'a IndexMap<String, Supply>,
}

impl<'a> UsageLog<'a> {
    pub fn new(
        records: &'a IndexMap<String, UsageRecord>,
        supplies: &'a IndexMap<String, Supply>,
    ) -> Self {
        Self { records, supplies }
    }

    /// 某区域的全部用量（区域名精确匹配，忽略首尾空白）
    pub fn history_for_area(&self, area: &str) -> Vec<UsageEvent> {
        let area = area.trim();
        self.events(|r| r.area == area)
    }

    /// 日期区间内的全部用量
    #[instrument(skip(self))]
    pub fn between(&self, range: DateRange) -> Vec<UsageEvent> {
        self.events(|r| range.contains(&r.used_at))
    }

    /// 某物资（按名称，含同名多批次）在某区域的平均单次用量
    ///
    /// 没有任何记录时返回 None
    pub fn average_for(&self, supply_name: &str, area: &str) -> Option<AreaUsageAverage> {
        let supply_name = supply_name.trim();
        let area = area.trim();
        let matched: Vec<u32> = self
            .records
            .values()
            .filter(|r| r.area == area && self.name_of(&r.supply_id) == supply_name)
            .map(|r| r.quantity_used)
            .collect();
        if matched.is_empty() {
            return None;
        }

        let total_used: u64 = matched.iter().map(|q| u64::from(*q)).sum();
        let average = total_used as f64 / matched.len() as f64;
        Some(AreaUsageAverage {
            supply_name: supply_name.to_string(),
            area: area.to_string(),
            events: matched.len(),
            total_used,
            average_per_event: (average * 100.0).round() / 100.0,
        })
    }

    fn events(&self, keep: impl Fn(&UsageRecord) -> bool) -> Vec<UsageEvent> {
        self.records
            .values()
            .filter(|r| keep(*r))
            .map(|r| UsageEvent {
                usage_id: r.id.clone(),
                supply_id: r.supply_id.clone(),
                supply_name: self.name_of(&r.supply_id).to_string(),
                quantity_used: r.quantity_used,
                area: r.area.clone(),
                used_at: r.used_at,
            })
            .collect()
    }

    fn name_of(&self, supply_id: &str) -> &str {
        self.supplies
            .get(supply_id)
            .map(|s| s.name.as_str())
            .unwrap_or(UNKNOWN_SUPPLIER)
    }
}
