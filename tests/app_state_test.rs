// ==========================================
// AppState / API 集成测试
// ==========================================
// 覆盖: 按配置选择后端、表单输入校验、异步调用入口、报表、用量登记与临期预警
// ==========================================

mod test_helpers;

use agri_supply::api::ApiError;
use agri_supply::app::{spawn_api_call, AppState};
use agri_supply::config::BackendKind;
use agri_supply::domain::SupplyType;
use agri_supply::engine::UsageEntry;
use chrono::Duration;
use std::fs;
use std::sync::Arc;
use test_helpers::{fixed_clock, test_config, test_now};

fn new_state(dir: &std::path::Path, backend: BackendKind) -> AppState {
    AppState::with_clock(test_config(dir, backend), fixed_clock()).unwrap()
}

#[test]
fn test_backend_selected_by_config() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_state(dir.path(), BackendKind::Sqlite);
    state
        .inventory_api
        .add_supplier("Green Fields", "sales@greenfields.com")
        .unwrap();
    assert!(dir.path().join("agri_supply.db").exists());
    assert!(!dir.path().join("suppliers.csv").exists());

    let dir = tempfile::tempdir().unwrap();
    let state = new_state(dir.path(), BackendKind::Csv);
    state
        .inventory_api
        .add_supplier("Green Fields", "sales@greenfields.com")
        .unwrap();
    assert!(dir.path().join("suppliers.csv").exists());
}

#[test]
fn test_form_input_validation() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_state(dir.path(), BackendKind::Csv);
    let api = &state.inventory_api;

    assert!(matches!(
        api.add_supplier("Green Fields", "not-an-email"),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(api.add_supplier("  ", "a@b.co"), Err(ApiError::InvalidInput(_))));

    api.add_supplier("Green Fields", "sales@greenfields.com").unwrap();
    for bad_quantity in ["", "12a", "-3", "4.5"] {
        assert!(matches!(
            api.add_supply("Urea", bad_quantity, "Green Fields", "Fertilizers"),
            Err(ApiError::InvalidInput(_))
        ));
    }
    assert!(matches!(
        api.add_supply("Urea", "10", "Green Fields", "Tractors"),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        api.add_supply("Urea", "10", "Nobody", "Fertilizers"),
        Err(ApiError::ReferenceError(_))
    ));
    assert!(api.list_supplies().unwrap().is_empty());
}

#[test]
fn test_listing_and_supplier_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_state(dir.path(), BackendKind::Sqlite);
    let api = &state.inventory_api;

    let supplier_id = api.add_supplier("Green Fields", "sales@greenfields.com").unwrap();
    api.add_supplier("Sun Seeds", "hi@sunseeds.org").unwrap();
    let supply_id = api.add_supply("Corn", "75", "Green Fields", "seeds").unwrap();

    assert_eq!(api.supplier_names().unwrap(), vec!["Green Fields", "Sun Seeds"]);
    let rows = api.list_supplies().unwrap();
    assert_eq!(rows[0].supplier_name, "Green Fields");
    assert_eq!(rows[0].supply_type, SupplyType::Seeds);

    api.update_supply(&supply_id, "Corn", "80", "Sun Seeds", "Seeds").unwrap();
    let rows = api.list_supplies().unwrap();
    assert_eq!(rows[0].quantity, 80);
    assert_eq!(rows[0].supplier_name, "Sun Seeds");
    assert_eq!(rows[0].created_at, test_now());

    api.update_supplier(&supplier_id, "Green Fields Ltd", "orders@greenfields.com")
        .unwrap();
    api.remove_supplier(&supplier_id).unwrap();
    assert!(matches!(
        api.remove_supplier(&supplier_id),
        Err(ApiError::NotFound(_))
    ));

    let sun_id = api.list_suppliers().unwrap()[0].id.clone();
    assert!(matches!(
        api.remove_supplier(&sun_id),
        Err(ApiError::BusinessRuleViolation(_))
    ));
}

#[test]
fn test_reports_over_imported_history() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_state(dir.path(), BackendKind::Csv);
    let at = |days: i64| {
        (test_now() - Duration::days(days))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    };

    let doc = format!(
        r#"{{
            "suppliers": {{"S1": {{"name": "Green Fields", "email": "a@b.co", "created_at": "{d0}"}}}},
            "supplies": {{
                "A": {{"name": "Urea", "quantity": 10, "supplier_id": "S1", "type": "Fertilizers", "created_at": "{d1}"}},
                "B": {{"name": "Potash", "quantity": 5, "supplier_id": "S1", "type": "Fertilizers", "created_at": "{d1}"}},
                "C": {{"name": "Corn", "quantity": 20, "supplier_id": "S1", "type": "Seeds", "created_at": "{d1}"}},
                "D": {{"name": "Rice", "quantity": 30, "supplier_id": "S1", "type": "Seeds", "created_at": "{d89}"}},
                "E": {{"name": "Wheat", "quantity": 500, "supplier_id": "S1", "type": "Seeds", "created_at": "{d91}"}}
            }}
        }}"#,
        d0 = at(100),
        d1 = at(1),
        d89 = at(89),
        d91 = at(91),
    );
    let path = dir.path().join("history.json");
    fs::write(&path, doc).unwrap();
    state.transfer_api.import_file(Some(&path)).unwrap();

    let report = state.report_api.usage_report().unwrap();
    assert_eq!(report.evaluated_at, test_now());
    assert_eq!(
        report.by_type,
        vec![UsageEntry::new("Seeds", 550), UsageEntry::new("Fertilizers", 15)]
    );
    assert_eq!(report.by_supplier, vec![UsageEntry::new("Green Fields", 565)]);
    let month_total: u64 = report.by_month.iter().map(|e| e.total).sum();
    assert_eq!(month_total, 65);
    let day_total: u64 = report.by_day.iter().map(|e| e.total).sum();
    assert_eq!(day_total, 35);

    let forecast = state.report_api.forecast("10", "0").unwrap();
    let corn = forecast.iter().find(|f| f.name == "Corn").unwrap();
    assert_eq!(corn.daily_usage_avg, 0.67);
    assert_eq!(corn.projected_usage_next_window, 22.0);
    assert!(forecast.iter().all(|f| f.name != "Rice"));

    assert!(matches!(
        state.report_api.forecast("ten", "0"),
        Err(ApiError::InvalidRate(_))
    ));
    assert!(matches!(
        state.report_api.forecast("10", ""),
        Err(ApiError::InvalidRate(_))
    ));

    let alerts = state.report_api.low_stock_alerts(None).unwrap();
    let names: Vec<&str> = alerts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Urea", "Potash", "Corn", "Rice"]);
    assert_eq!(state.report_api.low_stock_alerts(Some(10)).unwrap().len(), 2);
}

#[test]
fn test_usage_recording_and_expiry_reports() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_state(dir.path(), BackendKind::Sqlite);
    let api = &state.inventory_api;

    api.add_supplier("Agro Chem", "orders@agrochem.com").unwrap();
    let fungicide = api.add_supply("Fungicide", "20", "Agro Chem", "Pesticides").unwrap();
    let urea = api.add_supply("Urea", "100", "Agro Chem", "Fertilizers").unwrap();
    api.set_expiration_date(&fungicide, "2024-07-20").unwrap();
    assert!(matches!(
        api.set_expiration_date(&urea, "someday"),
        Err(ApiError::InvalidInput(_))
    ));

    api.record_usage(&fungicide, "5", "North Field", "2024-06-10").unwrap();
    api.record_usage(&fungicide, "3", "North Field", "2024-06-20 09:30:00").unwrap();
    api.record_usage(&urea, "40", "South Field", "").unwrap();

    let rows = api.list_supplies().unwrap();
    assert_eq!(rows[0].quantity, 12);
    assert_eq!(rows[1].quantity, 60);
    assert_eq!(api.list_usage().unwrap().len(), 3);
    assert_eq!(api.list_usage().unwrap()[2].used_at, test_now());

    // 库存不足、未知物资、零用量: 库存保持不变
    for (supply_id, qty) in [(fungicide.as_str(), "13"), ("ghost", "1"), (urea.as_str(), "0")] {
        assert!(matches!(
            api.record_usage(supply_id, qty, "North Field", ""),
            Err(ApiError::InvalidInput(_))
        ));
    }
    assert_eq!(api.list_supplies().unwrap()[0].quantity, 12);

    let reports = &state.report_api;
    let north = reports.usage_history("North Field").unwrap();
    assert_eq!(north.len(), 2);
    assert_eq!(north[0].supply_name, "Fungicide");

    let june = reports.usage_between("2024-06-10", "2024-06-20").unwrap();
    assert_eq!(june.len(), 2);
    assert!(matches!(
        reports.usage_between("2024-06-20", "2024-06-10"),
        Err(ApiError::InvalidInput(_))
    ));

    let avg = reports.usage_average("Fungicide", "North Field").unwrap().unwrap();
    assert_eq!(avg.average_per_event, 4.0);
    assert!(reports.usage_average("Urea", "North Field").unwrap().is_none());

    let alerts = reports.expiry_alerts(None).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].supply_id, fungicide);
    assert_eq!(alerts[0].days_remaining, 20);
    assert!(reports.expiry_alerts(Some(10)).unwrap().is_empty());

    // 删除物资同时删除其用量记录
    api.remove_supply(&fungicide).unwrap();
    assert!(reports.usage_history("North Field").unwrap().is_empty());
}

#[tokio::test]
async fn test_spawn_api_call_runs_on_worker() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_state(dir.path(), BackendKind::Csv);

    let api = Arc::clone(&state.inventory_api);
    let id = spawn_api_call(api, "test.add_supplier", |api| {
        api.add_supplier("Green Fields", "sales@greenfields.com")
    })
    .await
    .unwrap();

    let api = Arc::clone(&state.inventory_api);
    let suppliers = spawn_api_call(api, "test.list_suppliers", |api| api.list_suppliers())
        .await
        .unwrap();
    assert_eq!(suppliers.len(), 1);
    assert_eq!(suppliers[0].id, id);

    let report = Arc::clone(&state.report_api);
    let err = spawn_api_call(report, "test.forecast", |api| api.forecast("x", "0"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRate(_)));
}
