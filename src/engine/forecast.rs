// ==========================================
// 农资供应管理系统 - 用量预测引擎
// ==========================================
// 步骤:
//   1. 取近 N 天（默认 30，含起点）创建的物资
//   2. 按物资名称合计 quantity
//   3. daily = total / N
//   4. projected = daily * N * (1 + growth%/100) * (1 + waste%/100)
// 输出保留两位小数；负增长率合法，不做截断
// ==========================================

use crate::domain::Supply;
use crate::engine::usage_report::window_start;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

pub const DEFAULT_FORECAST_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_GROWTH_RATE_PERCENT: f64 = 10.0;
pub const DEFAULT_WASTE_RATE_PERCENT: f64 = 0.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("无效的比率 {field}: {value:?}")]
    InvalidRate { field: &'static str, value: String },
}

pub type ForecastResult<T> = Result<T, ForecastError>;

// ==========================================
// ForecastRates - 增长率 / 损耗率（百分比）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRates {
    pub growth_rate_percent: f64,
    pub waste_rate_percent: f64,
}

impl Default for ForecastRates {
    fn default() -> Self {
        Self {
            growth_rate_percent: DEFAULT_GROWTH_RATE_PERCENT,
            waste_rate_percent: DEFAULT_WASTE_RATE_PERCENT,
        }
    }
}

impl ForecastRates {
    pub fn new(growth_rate_percent: f64, waste_rate_percent: f64) -> ForecastResult<Self> {
        check_finite("growth_rate_percent", growth_rate_percent)?;
        check_finite("waste_rate_percent", waste_rate_percent)?;
        Ok(Self {
            growth_rate_percent,
            waste_rate_percent,
        })
    }

    /// 从用户输入文本解析
    pub fn parse(growth_text: &str, waste_text: &str) -> ForecastResult<Self> {
        Ok(Self {
            growth_rate_percent: parse_rate("growth_rate_percent", growth_text)?,
            waste_rate_percent: parse_rate("waste_rate_percent", waste_text)?,
        })
    }

    fn multiplier(&self) -> f64 {
        (1.0 + self.growth_rate_percent / 100.0) * (1.0 + self.waste_rate_percent / 100.0)
    }
}

fn check_finite(field: &'static str, value: f64) -> ForecastResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ForecastError::InvalidRate {
            field,
            value: value.to_string(),
        })
    }
}

/// 解析百分比文本（必须是有限实数）
pub fn parse_rate(field: &'static str, text: &str) -> ForecastResult<f64> {
    let invalid = || ForecastError::InvalidRate {
        field,
        value: text.to_string(),
    };
    let value: f64 = text.trim().parse().map_err(|_| invalid())?;
    check_finite(field, value).map_err(|_| invalid())
}

/// 单个物资的预测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyForecast {
    pub name: String,
    pub total_used_last_window: u64,
    pub daily_usage_avg: f64,
    pub projected_usage_next_window: f64,
}

// ==========================================
// Forecaster
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    window_days: u32,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(DEFAULT_FORECAST_WINDOW_DAYS)
    }
}

impl Forecaster {
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days: window_days.max(1),
        }
    }

    /// 按物资名称输出预测（首次出现顺序）
    #[instrument(skip(self, supplies))]
    pub fn forecast<'a, I>(
        &self,
        supplies: I,
        rates: ForecastRates,
        now: DateTime<Utc>,
    ) -> Vec<SupplyForecast>
    where
        I: IntoIterator<Item = &'a Supply>,
    {
        let start = window_start(now, self.window_days);
        let mut totals: IndexMap<&str, u64> = IndexMap::new();
        for supply in supplies {
            if supply.created_at >= start {
                *totals.entry(supply.name.as_str()).or_insert(0) += u64::from(supply.quantity);
            }
        }

        let days = f64::from(self.window_days);
        let multiplier = rates.multiplier();
        totals
            .into_iter()
            .map(|(name, total)| {
                let daily = total as f64 / days;
                SupplyForecast {
                    name: name.to_string(),
                    total_used_last_window: total,
                    daily_usage_avg: round2(daily),
                    projected_usage_next_window: round2(daily * days * multiplier),
                }
            })
            .collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
