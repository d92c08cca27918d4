// ==========================================
// 农资供应管理系统 - 关系数据库持久化适配器
// ==========================================
// 表: supplier(id, name, email, created_at)
//     supply(id, name, quantity, supplier_id, type, created_at, expiration_date)
//     usage_record(id, supply_id, quantity_used, area, used_at)
// 合并语义: INSERT ... ON CONFLICT(id) DO UPDATE（保留 rowid，即插入顺序）
// 约束: 所有查询使用参数化
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::domain::{Supplier, Supply, SupplyType, UsageRecord};
use crate::identity::{format_date, format_timestamp, parse_date, parse_timestamp};
use crate::perf::install_sqlite_tracing;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::port::{PersistencePort, WriteBatch};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

// ==========================================
// SqliteRepository
// ==========================================
/// 关系数据库仓储
/// 职责: supplier / supply / usage_record 三张表的读取与事务化批量写入
/// 红线: 不含业务逻辑（引用完整性由 Store 保证）
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// 打开（或创建）数据库文件并建表
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let mut conn = open_sqlite_connection(db_path).map_err(|e| {
            RepositoryError::BackendUnavailable(format!("无法打开数据库 {}: {}", db_path, e))
        })?;
        install_sqlite_tracing(&mut conn);
        Self::prepare(conn)
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> RepositoryResult<Self> {
        ensure_schema(&conn)?;
        match read_schema_version(&conn)? {
            Some(v) if v != CURRENT_SCHEMA_VERSION => {
                warn!(found = v, expected = CURRENT_SCHEMA_VERSION, "schema_version 不一致");
            }
            _ => {}
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 共享连接（测试中用于直接执行 SQL）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务内写入
    // ==========================================

    fn upsert_supplier(tx: &Transaction, supplier: &Supplier) -> RepositoryResult<()> {
        let changed = tx.execute(
            r#"
            INSERT INTO supplier (id, name, email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                created_at = excluded.created_at
            "#,
            params![
                supplier.id,
                supplier.name,
                supplier.email,
                format_timestamp(&supplier.created_at),
            ],
        )?;
        expect_single_row("supplier", &supplier.id, changed)
    }

    fn upsert_supply(tx: &Transaction, supply: &Supply) -> RepositoryResult<()> {
        let changed = tx.execute(
            r#"
            INSERT INTO supply (id, name, quantity, supplier_id, type, created_at, expiration_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                quantity = excluded.quantity,
                supplier_id = excluded.supplier_id,
                type = excluded.type,
                created_at = excluded.created_at,
                expiration_date = excluded.expiration_date
            "#,
            params![
                supply.id,
                supply.name,
                supply.quantity,
                supply.supplier_id,
                supply.supply_type.as_str(),
                format_timestamp(&supply.created_at),
                supply.expiration_date.as_ref().map(format_date),
            ],
        )?;
        expect_single_row("supply", &supply.id, changed)
    }

    fn upsert_usage(tx: &Transaction, record: &UsageRecord) -> RepositoryResult<()> {
        let changed = tx.execute(
            r#"
            INSERT INTO usage_record (id, supply_id, quantity_used, area, used_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                supply_id = excluded.supply_id,
                quantity_used = excluded.quantity_used,
                area = excluded.area,
                used_at = excluded.used_at
            "#,
            params![
                record.id,
                record.supply_id,
                record.quantity_used,
                record.area,
                format_timestamp(&record.used_at),
            ],
        )?;
        expect_single_row("usage_record", &record.id, changed)
    }
}

/// upsert 必须恰好影响一行，否则视为部分写入
fn expect_single_row(table: &str, id: &str, changed: usize) -> RepositoryResult<()> {
    if changed != 1 {
        return Err(RepositoryError::PartialWriteDetected(format!(
            "{} id={} 影响行数为 {}",
            table, id, changed
        )));
    }
    Ok(())
}

impl PersistencePort for SqliteRepository {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn fetch_suppliers(&self) -> RepositoryResult<Vec<Supplier>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, email, created_at FROM supplier ORDER BY rowid",
        )?;
        let suppliers = stmt
            .query_map([], map_supplier_row)?
            .collect::<SqliteResult<Vec<Supplier>>>()?;
        Ok(suppliers)
    }

    fn fetch_supplies(&self) -> RepositoryResult<Vec<Supply>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, quantity, supplier_id, type, created_at, expiration_date
            FROM supply
            ORDER BY rowid
            "#,
        )?;
        let supplies = stmt
            .query_map([], map_supply_row)?
            .collect::<SqliteResult<Vec<Supply>>>()?;
        Ok(supplies)
    }

    fn fetch_usage_records(&self) -> RepositoryResult<Vec<UsageRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, supply_id, quantity_used, area, used_at
            FROM usage_record
            ORDER BY rowid
            "#,
        )?;
        let records = stmt
            .query_map([], map_usage_row)?
            .collect::<SqliteResult<Vec<UsageRecord>>>()?;
        Ok(records)
    }

    /// 事务化批量提交
    ///
    /// 任一语句失败时 `tx` 在离开作用域时回滚，数据库保持提交前状态。
    fn apply(&self, batch: &WriteBatch) -> RepositoryResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        for supplier in batch.upsert_suppliers.values() {
            Self::upsert_supplier(&tx, supplier)?;
        }
        for supply in batch.upsert_supplies.values() {
            Self::upsert_supply(&tx, supply)?;
        }
        for record in batch.upsert_usage.values() {
            Self::upsert_usage(&tx, record)?;
        }
        for id in &batch.delete_usage {
            tx.execute("DELETE FROM usage_record WHERE id = ?1", params![id])?;
        }
        for id in &batch.delete_supplies {
            tx.execute("DELETE FROM supply WHERE id = ?1", params![id])?;
        }
        for id in &batch.delete_suppliers {
            tx.execute("DELETE FROM supplier WHERE id = ?1", params![id])?;
        }

        tx.commit()?;
        debug!(backend = "sqlite", records = batch.len(), "批次已提交");
        Ok(())
    }
}

// ==========================================
// 行映射
// ==========================================

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn timestamp_column(row: &Row, idx: usize) -> SqliteResult<chrono::DateTime<chrono::Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(idx, format!("时间格式错误: {}", raw)))
}

fn map_supplier_row(row: &Row) -> SqliteResult<Supplier> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let email: String = row.get(2)?;
    Supplier::new(id, &name, &email, timestamp_column(row, 3)?)
        .map_err(|e| conversion_error(0, e.to_string()))
}

fn map_supply_row(row: &Row) -> SqliteResult<Supply> {
    let type_raw: String = row.get(4)?;
    let supply_type = type_raw
        .parse::<SupplyType>()
        .map_err(|e| conversion_error(4, e.to_string()))?;
    let expiration_date = match row.get::<_, Option<String>>(6)? {
        Some(raw) if !raw.trim().is_empty() => Some(
            parse_date(&raw).ok_or_else(|| conversion_error(6, format!("日期格式错误: {}", raw)))?,
        ),
        _ => None,
    };

    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let supplier_id: String = row.get(3)?;
    Supply::new(
        id,
        &name,
        row.get(2)?,
        &supplier_id,
        supply_type,
        timestamp_column(row, 5)?,
    )
    .map(|s| s.with_expiration_date(expiration_date))
    .map_err(|e| conversion_error(0, e.to_string()))
}

fn map_usage_row(row: &Row) -> SqliteResult<UsageRecord> {
    let id: String = row.get(0)?;
    let supply_id: String = row.get(1)?;
    let area: String = row.get(3)?;
    UsageRecord::new(id, &supply_id, row.get(2)?, &area, timestamp_column(row, 4)?)
        .map_err(|e| conversion_error(0, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn supply(id: &str, name: &str, quantity: u32) -> Supply {
        Supply::new(
            id,
            name,
            quantity,
            "S1",
            SupplyType::Seeds,
            parse_timestamp("2024-05-01 12:00:00").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_upsert_then_fetch_preserves_order() {
        let repo = SqliteRepository::in_memory().unwrap();
        let mut batch = IndexMap::new();
        batch.insert("P2".to_string(), supply("P2", "Wheat", 5));
        batch.insert("P1".to_string(), supply("P1", "Corn", 7));
        repo.upsert_supplies(&batch).unwrap();

        let mut update = IndexMap::new();
        update.insert("P2".to_string(), supply("P2", "Wheat", 50));
        repo.upsert_supplies(&update).unwrap();

        let fetched = repo.fetch_supplies().unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].id, "P2");
        assert_eq!(fetched[0].quantity, 50);
        assert_eq!(fetched[1].id, "P1");
    }

    #[test]
    fn test_unknown_type_in_table_is_constraint_violation() {
        let repo = SqliteRepository::in_memory().unwrap();
        {
            let conn = repo.connection();
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO supply (id, name, quantity, supplier_id, type, created_at)
                 VALUES ('P1', 'Corn', 1, 'S1', 'Tractors', '2024-05-01 12:00:00')",
                [],
            )
            .unwrap();
        }
        assert!(matches!(
            repo.fetch_supplies(),
            Err(RepositoryError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_expiration_and_usage_persisted() {
        let repo = SqliteRepository::in_memory().unwrap();
        let dated = supply("P1", "Corn", 7).with_expiration_date(chrono::NaiveDate::from_ymd_opt(2024, 12, 1));
        let usage = UsageRecord::new(
            "U1",
            "P1",
            2,
            "East Plot",
            parse_timestamp("2024-05-02 06:30:00").unwrap(),
        )
        .unwrap();

        let mut batch = WriteBatch::new();
        batch.upsert_supplies.insert("P1".to_string(), dated.clone());
        batch.upsert_usage.insert("U1".to_string(), usage.clone());
        repo.apply(&batch).unwrap();

        assert_eq!(repo.fetch_supplies().unwrap(), vec![dated]);
        assert_eq!(repo.fetch_usage_records().unwrap(), vec![usage]);

        repo.apply(&WriteBatch::new().delete_usage_record("U1")).unwrap();
        assert!(repo.fetch_usage_records().unwrap().is_empty());
    }

    #[test]
    fn test_delete_in_batch() {
        let repo = SqliteRepository::in_memory().unwrap();
        let mut batch = IndexMap::new();
        batch.insert("P1".to_string(), supply("P1", "Corn", 7));
        repo.upsert_supplies(&batch).unwrap();

        repo.apply(&WriteBatch::new().delete_supply("P1")).unwrap();
        assert!(repo.fetch_supplies().unwrap().is_empty());
    }
}
