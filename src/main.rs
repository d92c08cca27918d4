// ==========================================
// 农资供应管理系统 - 命令行入口
// ==========================================
// 加载配置 → 装配 AppState → 输出用量汇总、预测、低库存与临期预警（JSON）
// ==========================================

use agri_supply::app::{spawn_api_call, AppState};
use agri_supply::config::AppConfig;
use agri_supply::logging;
use anyhow::Context;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", agri_supply::APP_NAME, agri_supply::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::load().context("加载配置失败")?;
    let state = AppState::new(config).context("初始化应用状态失败")?;

    let report_api = Arc::clone(&state.report_api);
    let usage = spawn_api_call(report_api, "cli.usage_report", |api| api.usage_report()).await?;
    tracing::info!(report = %serde_json::to_string(&usage)?, "用量汇总");

    let report_api = Arc::clone(&state.report_api);
    let forecast =
        spawn_api_call(report_api, "cli.forecast", |api| api.forecast_with_defaults()).await?;
    tracing::info!(forecast = %serde_json::to_string(&forecast)?, "用量预测");

    let report_api = Arc::clone(&state.report_api);
    let alerts = spawn_api_call(report_api, "cli.low_stock", |api| api.low_stock_alerts(None)).await?;
    if alerts.is_empty() {
        tracing::info!("无低库存物资");
    } else {
        tracing::warn!(count = alerts.len(), alerts = %serde_json::to_string(&alerts)?, "低库存预警");
    }

    let report_api = Arc::clone(&state.report_api);
    let expiring = spawn_api_call(report_api, "cli.expiry", |api| api.expiry_alerts(None)).await?;
    if expiring.is_empty() {
        tracing::info!("无临期物资");
    } else {
        tracing::warn!(count = expiring.len(), alerts = %serde_json::to_string(&expiring)?, "临期预警");
    }

    Ok(())
}
