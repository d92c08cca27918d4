// ==========================================
// 农资供应管理系统 - CSV 持久化适配器
// ==========================================
// 文件: suppliers.csv / supplies.csv / usage.csv
// 表头: ID,Name,Email,Created At
//       ID,Name,Quantity,Supplier,Created At,Type,Expiration Date
//       ID,Supply,Quantity Used,Area,Used At
// 文件不存在 → 视为空集合；字段值按原样读取，规范化由领域构造函数完成
// 原子性: 先写临时文件，全部成功后再 rename 替换原文件
// ==========================================

use crate::domain::{Supplier, Supply, SupplyType, UsageRecord};
use crate::identity::{format_date, format_timestamp, parse_date, parse_timestamp};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::port::{PersistencePort, WriteBatch};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

pub const SUPPLIER_CSV_FILE: &str = "suppliers.csv";
pub const SUPPLY_CSV_FILE: &str = "supplies.csv";
pub const USAGE_CSV_FILE: &str = "usage.csv";

pub const SUPPLIER_HEADERS: [&str; 4] = ["ID", "Name", "Email", "Created At"];
pub const SUPPLY_HEADERS: [&str; 7] = [
    "ID",
    "Name",
    "Quantity",
    "Supplier",
    "Created At",
    "Type",
    "Expiration Date",
];
pub const USAGE_HEADERS: [&str; 5] = ["ID", "Supply", "Quantity Used", "Area", "Used At"];

// ==========================================
// CsvRepository
// ==========================================
pub struct CsvRepository {
    dir: PathBuf,
    // 串行化同一进程内的读-改-写
    write_lock: Mutex<()>,
}

impl CsvRepository {
    /// 创建 CSV 仓储（目录不存在时创建）
    pub fn new(dir: impl Into<PathBuf>) -> RepositoryResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            RepositoryError::BackendUnavailable(format!("无法创建目录 {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn suppliers_path(&self) -> PathBuf {
        self.dir.join(SUPPLIER_CSV_FILE)
    }

    pub fn supplies_path(&self) -> PathBuf {
        self.dir.join(SUPPLY_CSV_FILE)
    }

    pub fn usage_path(&self) -> PathBuf {
        self.dir.join(USAGE_CSV_FILE)
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 读取
    // ==========================================

    fn read_suppliers(&self) -> RepositoryResult<IndexMap<String, Supplier>> {
        let path = self.suppliers_path();
        let mut suppliers = IndexMap::new();
        for (line, row) in read_rows(&path)? {
            let supplier = supplier_from_row(&row)
                .map_err(|msg| row_error(SUPPLIER_CSV_FILE, line, msg))?;
            suppliers.insert(supplier.id.clone(), supplier);
        }
        Ok(suppliers)
    }

    fn read_supplies(&self) -> RepositoryResult<IndexMap<String, Supply>> {
        let path = self.supplies_path();
        let mut supplies = IndexMap::new();
        for (line, row) in read_rows(&path)? {
            let supply =
                supply_from_row(&row).map_err(|msg| row_error(SUPPLY_CSV_FILE, line, msg))?;
            supplies.insert(supply.id.clone(), supply);
        }
        Ok(supplies)
    }

    fn read_usage(&self) -> RepositoryResult<IndexMap<String, UsageRecord>> {
        let path = self.usage_path();
        let mut records = IndexMap::new();
        for (line, row) in read_rows(&path)? {
            let record =
                usage_from_row(&row).map_err(|msg| row_error(USAGE_CSV_FILE, line, msg))?;
            records.insert(record.id.clone(), record);
        }
        Ok(records)
    }
}

impl PersistencePort for CsvRepository {
    fn backend_name(&self) -> &'static str {
        "csv"
    }

    fn fetch_suppliers(&self) -> RepositoryResult<Vec<Supplier>> {
        let _guard = self.lock()?;
        Ok(self.read_suppliers()?.into_values().collect())
    }

    fn fetch_supplies(&self) -> RepositoryResult<Vec<Supply>> {
        let _guard = self.lock()?;
        Ok(self.read_supplies()?.into_values().collect())
    }

    fn fetch_usage_records(&self) -> RepositoryResult<Vec<UsageRecord>> {
        let _guard = self.lock()?;
        Ok(self.read_usage()?.into_values().collect())
    }

    /// 批量提交
    ///
    /// 流程:
    /// 1. 读取当前文件内容（失败 → 整批放弃，文件不动）
    /// 2. 在内存中合并 upsert / delete
    /// 3. 把受影响的文件写成 *.tmp
    /// 4. 依次 rename 覆盖原文件；后续 rename 失败时恢复已替换的文件
    fn apply(&self, batch: &WriteBatch) -> RepositoryResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let _guard = self.lock()?;

        let mut staged: Vec<StagedFile> = Vec::new();
        if let Err(e) = self.stage_batch(batch, &mut staged) {
            discard_staged(&staged);
            return Err(e);
        }

        commit_staged(&staged)?;
        debug!(backend = "csv", records = batch.len(), "批次已提交");
        Ok(())
    }
}

impl CsvRepository {
    /// 合并批次并写出临时文件（不触碰原文件）
    fn stage_batch(&self, batch: &WriteBatch, staged: &mut Vec<StagedFile>) -> RepositoryResult<()> {
        if batch.touches_suppliers() {
            let path = self.suppliers_path();
            let previous = read_raw(&path)?;
            let mut suppliers = self.read_suppliers()?;
            for (id, supplier) in &batch.upsert_suppliers {
                supplier
                    .validate()
                    .map_err(|e| RepositoryError::ConstraintViolation(format!("供应商 {}: {}", id, e)))?;
                suppliers.insert(id.clone(), supplier.clone());
            }
            for id in &batch.delete_suppliers {
                suppliers.shift_remove(id);
            }
            let rows = suppliers.values().map(supplier_to_row).collect::<Vec<_>>();
            staged.push(stage_file(&path, &SUPPLIER_HEADERS, &rows, previous)?);
        }

        if batch.touches_supplies() {
            let path = self.supplies_path();
            let previous = read_raw(&path)?;
            let mut supplies = self.read_supplies()?;
            for (id, supply) in &batch.upsert_supplies {
                supply
                    .validate(false)
                    .map_err(|e| RepositoryError::ConstraintViolation(format!("物资 {}: {}", id, e)))?;
                supplies.insert(id.clone(), supply.clone());
            }
            for id in &batch.delete_supplies {
                supplies.shift_remove(id);
            }
            let rows = supplies.values().map(supply_to_row).collect::<Vec<_>>();
            staged.push(stage_file(&path, &SUPPLY_HEADERS, &rows, previous)?);
        }

        if batch.touches_usage() {
            let path = self.usage_path();
            let previous = read_raw(&path)?;
            let mut records = self.read_usage()?;
            for (id, record) in &batch.upsert_usage {
                record
                    .validate()
                    .map_err(|e| RepositoryError::ConstraintViolation(format!("用量记录 {}: {}", id, e)))?;
                records.insert(id.clone(), record.clone());
            }
            for id in &batch.delete_usage {
                records.shift_remove(id);
            }
            let rows = records.values().map(usage_to_row).collect::<Vec<_>>();
            staged.push(stage_file(&path, &USAGE_HEADERS, &rows, previous)?);
        }

        Ok(())
    }
}

// ==========================================
// 暂存文件 / 提交 / 恢复
// ==========================================

struct StagedFile {
    target: PathBuf,
    tmp: PathBuf,
    // 提交前的原始内容；None 表示原文件不存在
    previous: Option<Vec<u8>>,
}

fn tmp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

fn stage_file(
    target: &Path,
    headers: &[&str],
    rows: &[Vec<String>],
    previous: Option<Vec<u8>>,
) -> RepositoryResult<StagedFile> {
    let tmp = tmp_path_for(target);
    write_csv(&tmp, headers, rows).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })?;
    Ok(StagedFile {
        target: target.to_path_buf(),
        tmp,
        previous,
    })
}

fn discard_staged(staged: &[StagedFile]) {
    for file in staged {
        let _ = fs::remove_file(&file.tmp);
    }
}

fn commit_staged(staged: &[StagedFile]) -> RepositoryResult<()> {
    for (idx, file) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(&file.tmp, &file.target) {
            warn!(target_file = %file.target.display(), error = %e, "rename 失败，开始恢复");
            discard_staged(&staged[idx..]);
            restore(&staged[..idx])?;
            return Err(RepositoryError::BackendUnavailable(format!(
                "无法替换 {}: {}",
                file.target.display(),
                e
            )));
        }
    }
    Ok(())
}

/// 把已替换的文件恢复为提交前内容
fn restore(committed: &[StagedFile]) -> RepositoryResult<()> {
    for file in committed {
        let result = match &file.previous {
            Some(bytes) => {
                let tmp = tmp_path_for(&file.target);
                fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, &file.target))
            }
            None => fs::remove_file(&file.target),
        };
        if let Err(e) = result {
            error!(target_file = %file.target.display(), error = %e, "恢复失败");
            return Err(RepositoryError::PartialWriteDetected(format!(
                "{} 已被部分提交且无法恢复: {}",
                file.target.display(),
                e
            )));
        }
    }
    Ok(())
}

// ==========================================
// CSV 读写工具
// ==========================================

fn read_raw(path: &Path) -> RepositoryResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 读取 CSV 为 (行号, 表头→值) 列表；文件不存在返回空
fn read_rows(path: &Path) -> RepositoryResult<Vec<(usize, HashMap<String, String>)>> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record: StringRecord = result?;
        let row: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();

        // 跳过完全空白的行
        if row.values().all(|v| v.trim().is_empty()) {
            continue;
        }
        // 行号从 2 开始（第 1 行是表头）
        rows.push((idx + 2, row));
    }
    Ok(rows)
}

fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<String>]) -> RepositoryResult<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn row_error(file: &str, line: usize, message: String) -> RepositoryError {
    RepositoryError::ConstraintViolation(format!("{} 第 {} 行: {}", file, line, message))
}

fn field<'a>(row: &'a HashMap<String, String>, name: &str) -> Result<&'a str, String> {
    match row.get(name).map(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!("缺少字段 {}", name)),
    }
}

/// 可选列：列不存在或值为空 → None
fn optional_field<'a>(row: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    row.get(name)
        .map(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
}

fn timestamp_field(row: &HashMap<String, String>, name: &str) -> Result<chrono::DateTime<chrono::Utc>, String> {
    let raw = field(row, name)?;
    parse_timestamp(raw).ok_or_else(|| format!("时间格式错误: {}", raw))
}

fn count_field(row: &HashMap<String, String>, name: &str) -> Result<u32, String> {
    let raw = field(row, name)?;
    raw.trim()
        .parse::<u32>()
        .map_err(|_| format!("数量格式错误: {}", raw))
}

fn supplier_from_row(row: &HashMap<String, String>) -> Result<Supplier, String> {
    Supplier::new(
        field(row, "ID")?,
        field(row, "Name")?,
        field(row, "Email")?,
        timestamp_field(row, "Created At")?,
    )
    .map_err(|e| e.to_string())
}

fn supply_from_row(row: &HashMap<String, String>) -> Result<Supply, String> {
    let supply_type = match optional_field(row, "Type") {
        Some(v) => v.parse::<SupplyType>().map_err(|e| e.to_string())?,
        None => SupplyType::Other,
    };
    let expiration_date = match optional_field(row, "Expiration Date") {
        Some(v) => Some(parse_date(v).ok_or_else(|| format!("日期格式错误: {}", v))?),
        None => None,
    };

    Supply::new(
        field(row, "ID")?,
        field(row, "Name")?,
        count_field(row, "Quantity")?,
        field(row, "Supplier")?,
        supply_type,
        timestamp_field(row, "Created At")?,
    )
    .map(|s| s.with_expiration_date(expiration_date))
    .map_err(|e| e.to_string())
}

fn usage_from_row(row: &HashMap<String, String>) -> Result<UsageRecord, String> {
    UsageRecord::new(
        field(row, "ID")?,
        field(row, "Supply")?,
        count_field(row, "Quantity Used")?,
        field(row, "Area")?,
        timestamp_field(row, "Used At")?,
    )
    .map_err(|e| e.to_string())
}

fn supplier_to_row(s: &Supplier) -> Vec<String> {
    vec![
        s.id.clone(),
        s.name.clone(),
        s.email.clone(),
        format_timestamp(&s.created_at),
    ]
}

fn supply_to_row(s: &Supply) -> Vec<String> {
    vec![
        s.id.clone(),
        s.name.clone(),
        s.quantity.to_string(),
        s.supplier_id.clone(),
        format_timestamp(&s.created_at),
        s.supply_type.to_string(),
        s.expiration_date.as_ref().map(format_date).unwrap_or_default(),
    ]
}

fn usage_to_row(u: &UsageRecord) -> Vec<String> {
    vec![
        u.id.clone(),
        u.supply_id.clone(),
        u.quantity_used.to_string(),
        u.area.clone(),
        format_timestamp(&u.used_at),
    ]
}
