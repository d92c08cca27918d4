// ==========================================
// 农资供应管理系统 - 报表 API
// ==========================================
// 职责: 用量汇总、用量预测、低库存预警、用量记录查询、临期预警
// 约束: 只读；每次调用只取一次"当前时间"
// ==========================================

use crate::api::error::ApiResult;
use crate::api::{lock_store, SharedStore};
use crate::config::AppConfig;
use crate::domain::validation::parse_date_input;
use crate::engine::{
    AreaUsageAverage, DateRange, ExpiryAlert, ExpiryMonitor, ForecastRates, Forecaster,
    LowStockAlert, LowStockMonitor, SupplyForecast, UsageAggregator, UsageEvent, UsageLog,
    UsageReport,
};
use crate::perf::PerfGuard;
use tracing::debug;

#[derive(Clone)]
pub struct ReportApi {
    store: SharedStore,
    aggregator: UsageAggregator,
    forecaster: Forecaster,
    default_rates: ForecastRates,
    low_stock_threshold: u32,
    expiry_alert_days: u32,
}

impl ReportApi {
    pub fn new(store: SharedStore, config: &AppConfig) -> Self {
        Self {
            store,
            aggregator: UsageAggregator::new(
                config.usage_month_window_days,
                config.usage_day_window_days,
            ),
            forecaster: Forecaster::new(config.forecast_window_days),
            default_rates: config.default_rates(),
            low_stock_threshold: config.low_stock_threshold,
            expiry_alert_days: config.expiry_alert_days,
        }
    }

    /// 用量汇总（五个视图）
    pub fn usage_report(&self) -> ApiResult<UsageReport> {
        let _perf = PerfGuard::new("report.usage");
        let store = lock_store(&self.store)?;
        let now = store.clock().now();
        let names = store.supplier_names();
        Ok(self.aggregator.aggregate(store.supplies().values(), &names, now))
    }

    /// 用量预测
    ///
    /// # 参数
    /// - growth_text: 增长率（百分比文本，可为负）
    /// - waste_text: 损耗率（百分比文本，可为负）
    ///
    /// # 返回
    /// - Err(ApiError::InvalidRate): 任一比率不是有限实数
    pub fn forecast(&self, growth_text: &str, waste_text: &str) -> ApiResult<Vec<SupplyForecast>> {
        let rates = ForecastRates::parse(growth_text, waste_text)?;
        self.forecast_with_rates(rates)
    }

    /// 使用配置中的默认比率预测
    pub fn forecast_with_defaults(&self) -> ApiResult<Vec<SupplyForecast>> {
        self.forecast_with_rates(self.default_rates)
    }

    fn forecast_with_rates(&self, rates: ForecastRates) -> ApiResult<Vec<SupplyForecast>> {
        let _perf = PerfGuard::new("report.forecast");
        let store = lock_store(&self.store)?;
        let now = store.clock().now();
        let result = self.forecaster.forecast(store.supplies().values(), rates, now);
        debug!(
            growth = rates.growth_rate_percent,
            waste = rates.waste_rate_percent,
            items = result.len(),
            "预测完成"
        );
        Ok(result)
    }

    /// 低库存预警（None 使用配置阈值）
    pub fn low_stock_alerts(&self, threshold: Option<u32>) -> ApiResult<Vec<LowStockAlert>> {
        let monitor = LowStockMonitor::new(threshold.unwrap_or(self.low_stock_threshold));
        let store = lock_store(&self.store)?;
        let names = store.supplier_names();
        Ok(monitor.scan(store.supplies().values(), &names))
    }

    // ==========================================
    // 用量记录查询
    // ==========================================

    /// 某区域的用量历史
    pub fn usage_history(&self, area: &str) -> ApiResult<Vec<UsageEvent>> {
        let store = lock_store(&self.store)?;
        let log = UsageLog::new(store.usage_records(), store.supplies());
        Ok(log.history_for_area(area))
    }

    /// 日期区间用量明细
    ///
    /// # 参数
    /// - start_text / end_text: `YYYY-MM-DD`，两端均包含
    ///
    /// # 返回
    /// - Err(ApiError::InvalidInput): 日期无法解析或起始晚于结束
    pub fn usage_between(&self, start_text: &str, end_text: &str) -> ApiResult<Vec<UsageEvent>> {
        let range = DateRange::new(parse_date_input(start_text)?, parse_date_input(end_text)?)?;
        let _perf = PerfGuard::new("report.usage_between");
        let store = lock_store(&self.store)?;
        let log = UsageLog::new(store.usage_records(), store.supplies());
        Ok(log.between(range))
    }

    /// 某物资在某区域的平均单次用量（无记录时为 None）
    pub fn usage_average(&self, supply_name: &str, area: &str) -> ApiResult<Option<AreaUsageAverage>> {
        let store = lock_store(&self.store)?;
        let log = UsageLog::new(store.usage_records(), store.supplies());
        Ok(log.average_for(supply_name, area))
    }

    /// 临期预警（None 使用配置天数）
    pub fn expiry_alerts(&self, days_ahead: Option<u32>) -> ApiResult<Vec<ExpiryAlert>> {
        let monitor = ExpiryMonitor::new(days_ahead.unwrap_or(self.expiry_alert_days));
        let store = lock_store(&self.store)?;
        let today = store.clock().now().date_naive();
        let names = store.supplier_names();
        let alerts = monitor.scan(store.supplies().values(), &names, today);
        debug!(alerts = alerts.len(), "临期扫描完成");
        Ok(alerts)
    }
}
