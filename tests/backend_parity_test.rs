// ==========================================
// 后端一致性集成测试
// ==========================================
// 同一批次分别写入 CSV 与 SQLite，读回的记录必须完全相同
// ==========================================

mod test_helpers;

use agri_supply::domain::SupplyType;
use agri_supply::identity::parse_date;
use agri_supply::repository::{CsvRepository, PersistencePort, SqliteRepository, WriteBatch};
use indexmap::IndexMap;
use test_helpers::{init_logging, supplier, supply, usage};

fn both_backends(dir: &std::path::Path) -> Vec<Box<dyn PersistencePort>> {
    vec![
        Box::new(CsvRepository::new(dir).unwrap()),
        Box::new(SqliteRepository::in_memory().unwrap()),
    ]
}

#[test]
fn test_padded_name_reads_back_identically() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut supplies = IndexMap::new();
    supplies.insert("P1".to_string(), supply("P1", "  Corn ", 12, "S1", SupplyType::Seeds));

    let mut names = Vec::new();
    for port in both_backends(dir.path()) {
        port.upsert_supplies(&supplies).unwrap();
        let fetched = port.fetch_supplies().unwrap();
        assert_eq!(fetched.len(), 1, "backend={}", port.backend_name());
        names.push(fetched[0].name.clone());
    }
    assert_eq!(names, vec!["Corn", "Corn"]);
}

#[test]
fn test_full_batch_reads_back_identically() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut suppliers = IndexMap::new();
    suppliers.insert("S1".to_string(), supplier("S1", "Green Fields", "a@b.co"));
    let mut padded = supply("P1", "Fungicide", 8, " S1 ", SupplyType::Pesticides);
    padded.expiration_date = parse_date("2024-07-15");
    let mut supplies = IndexMap::new();
    supplies.insert("P1".to_string(), padded);
    let mut records = IndexMap::new();
    records.insert(
        "U1".to_string(),
        usage("U1", "P1", 3, "North Field", "2024-06-10 07:00:00"),
    );
    let batch = WriteBatch::new()
        .with_suppliers(suppliers)
        .with_supplies(supplies)
        .with_usage(records);

    let mut results = Vec::new();
    for port in both_backends(dir.path()) {
        port.apply(&batch).unwrap();
        results.push((
            port.fetch_suppliers().unwrap(),
            port.fetch_supplies().unwrap(),
            port.fetch_usage_records().unwrap(),
        ));
    }

    let (csv, sqlite) = (&results[0], &results[1]);
    assert_eq!(csv, sqlite);
    assert_eq!(csv.1[0].supplier_id, "S1");
    assert_eq!(csv.1[0].expiration_date, parse_date("2024-07-15"));
    assert_eq!(csv.2[0].quantity_used, 3);
}
