// ==========================================
// SqliteRepository 集成测试
// ==========================================
// 覆盖: 批次中途失败整体回滚、重新打开后数据一致
// ==========================================

mod test_helpers;

use agri_supply::domain::{NewSupplier, NewSupply, SupplyType};
use agri_supply::repository::{PersistencePort, RepositoryError, SqliteRepository, WriteBatch};
use agri_supply::store::{EntityStore, StoreError};
use indexmap::IndexMap;
use test_helpers::{create_test_db, fixed_clock, supplier, supply};

/// 名称为 BOOM 的物资在插入时触发 ABORT
fn install_failing_trigger(repo: &SqliteRepository) {
    let conn = repo.connection();
    let conn = conn.lock().unwrap();
    conn.execute_batch(
        r#"
        CREATE TRIGGER fail_on_boom BEFORE INSERT ON supply
        WHEN NEW.name = 'BOOM'
        BEGIN
            SELECT RAISE(ABORT, 'boom');
        END;
        "#,
    )
    .unwrap();
}

#[test]
fn test_mid_batch_failure_leaves_nothing_behind() {
    let (_file, db_path) = create_test_db().unwrap();
    let repo = SqliteRepository::new(&db_path).unwrap();
    install_failing_trigger(&repo);

    let mut supplies = IndexMap::new();
    for (id, name) in [("P1", "Corn"), ("P2", "BOOM"), ("P3", "Rice")] {
        supplies.insert(id.to_string(), supply(id, name, 10, "S1", SupplyType::Seeds));
    }
    let mut suppliers = IndexMap::new();
    suppliers.insert("S1".to_string(), supplier("S1", "Green Fields", "a@b.co"));

    let batch = WriteBatch::new()
        .with_suppliers(suppliers)
        .with_supplies(supplies);
    let err = repo.apply(&batch).unwrap_err();
    assert!(matches!(err, RepositoryError::ConstraintViolation(_)), "{:?}", err);

    assert!(repo.fetch_suppliers().unwrap().is_empty());
    assert!(repo.fetch_supplies().unwrap().is_empty());
}

#[test]
fn test_store_rolls_back_when_backend_aborts() {
    let (_file, db_path) = create_test_db().unwrap();
    let repo = SqliteRepository::new(&db_path).unwrap();
    install_failing_trigger(&repo);

    let mut store = EntityStore::load(Box::new(repo), fixed_clock(), false).unwrap();
    store
        .add_supplier(NewSupplier::new("Green Fields", "sales@greenfields.com").unwrap())
        .unwrap();
    store
        .add_supply(NewSupply::new("Corn", 10, "Green Fields", SupplyType::Seeds).unwrap())
        .unwrap();
    let before = store.snapshot();

    let err = store
        .add_supply(NewSupply::new("BOOM", 1, "Green Fields", SupplyType::Other).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Persistence(RepositoryError::ConstraintViolation(_))
    ));
    assert_eq!(store.snapshot(), before);

    store.reload().unwrap();
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_reopen_reads_committed_rows() {
    let (_file, db_path) = create_test_db().unwrap();
    {
        let repo = SqliteRepository::new(&db_path).unwrap();
        let mut suppliers = IndexMap::new();
        suppliers.insert("S1".to_string(), supplier("S1", "Green Fields", "a@b.co"));
        suppliers.insert("S2".to_string(), supplier("S2", "Sun Seeds", "c@d.org"));
        repo.upsert_suppliers(&suppliers).unwrap();
    }

    let repo = SqliteRepository::new(&db_path).unwrap();
    let ids: Vec<String> = repo
        .fetch_suppliers()
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["S1", "S2"]);
}
