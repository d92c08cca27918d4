// ==========================================
// 农资供应管理系统 - 快照文档（导入 / 导出）
// ==========================================
// 文档结构:
// {
//   "captured_at": "2024-06-01 08:00:00",
//   "suppliers": { "<id>": { "id", "name", "email", "created_at" } },
//   "supplies":  { "<id>": { "id", "name", "quantity", "supplier_id", "type", "created_at",
//                            "expiration_date" } },
//   "usage_records": { "<id>": { "id", "supply_id", "quantity_used", "area", "used_at" } }
// }
// 导入时:
// - 任一集合缺失 → 视为空
// - 记录内 id 缺失 → 取键名；与键名不一致 → 格式错误
// - created_at / used_at 缺失 → 填充当前时间；存在但无法解析 → 格式错误
// - 记录经领域构造函数重建（去除首尾空白），不满足不变量 → 格式错误
// ==========================================

use crate::domain::{Supplier, Supply, SupplyType, UsageRecord, ValidationError};
use crate::identity::{file_stamp, format_date, format_timestamp, parse_date, parse_timestamp, Clock};
use crate::importer::error::{ImportError, ImportResult};
use crate::store::EntitySnapshot;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

// ==========================================
// EntityKind - 导出范围
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Suppliers,
    Supplies,
    Usage,
    /// 供应商 + 物资 + 用量记录
    Inventory,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Suppliers => "suppliers",
            EntityKind::Supplies => "supplies",
            EntityKind::Usage => "usage",
            EntityKind::Inventory => "inventory",
        }
    }

    fn includes_suppliers(&self) -> bool {
        matches!(self, EntityKind::Suppliers | EntityKind::Inventory)
    }

    fn includes_supplies(&self) -> bool {
        matches!(self, EntityKind::Supplies | EntityKind::Inventory)
    }

    fn includes_usage(&self) -> bool {
        matches!(self, EntityKind::Usage | EntityKind::Inventory)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suppliers" => Ok(EntityKind::Suppliers),
            "supplies" => Ok(EntityKind::Supplies),
            "usage" => Ok(EntityKind::Usage),
            "inventory" => Ok(EntityKind::Inventory),
            other => Err(ImportError::MalformedDocument(format!(
                "未知的导出类型: {}",
                other
            ))),
        }
    }
}

// ==========================================
// 文档记录
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub quantity: u32,
    #[serde(alias = "supplierId", alias = "supplier")]
    pub supplier_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub supply_type: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "expirationDate", skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecordDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "supplyId", alias = "supply")]
    pub supply_id: String,
    #[serde(alias = "quantityUsed")]
    pub quantity_used: u32,
    pub area: String,
    #[serde(default, alias = "usedAt", alias = "date")]
    pub used_at: Option<String>,
}

impl From<&Supplier> for SupplierRecord {
    fn from(s: &Supplier) -> Self {
        Self {
            id: Some(s.id.clone()),
            name: s.name.clone(),
            email: s.email.clone(),
            created_at: Some(format_timestamp(&s.created_at)),
        }
    }
}

impl From<&Supply> for SupplyRecord {
    fn from(s: &Supply) -> Self {
        Self {
            id: Some(s.id.clone()),
            name: s.name.clone(),
            quantity: s.quantity,
            supplier_id: s.supplier_id.clone(),
            supply_type: Some(s.supply_type.as_str().to_string()),
            created_at: Some(format_timestamp(&s.created_at)),
            expiration_date: s.expiration_date.as_ref().map(format_date),
        }
    }
}

impl From<&UsageRecord> for UsageRecordDoc {
    fn from(u: &UsageRecord) -> Self {
        Self {
            id: Some(u.id.clone()),
            supply_id: u.supply_id.clone(),
            quantity_used: u.quantity_used,
            area: u.area.clone(),
            used_at: Some(format_timestamp(&u.used_at)),
        }
    }
}

// ==========================================
// SnapshotDocument
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default, alias = "capturedAt", skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppliers: Option<IndexMap<String, SupplierRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplies: Option<IndexMap<String, SupplyRecord>>,
    #[serde(default, alias = "usageRecords", skip_serializing_if = "Option::is_none")]
    pub usage_records: Option<IndexMap<String, UsageRecordDoc>>,
}

// ==========================================
// 导出
// ==========================================

/// 将 Store 快照序列化为交换文档
pub fn export_snapshot(
    snapshot: &EntitySnapshot,
    kind: EntityKind,
    captured_at: DateTime<Utc>,
) -> SnapshotDocument {
    SnapshotDocument {
        captured_at: Some(format_timestamp(&captured_at)),
        suppliers: kind.includes_suppliers().then(|| {
            snapshot
                .suppliers
                .iter()
                .map(|(id, s)| (id.clone(), SupplierRecord::from(s)))
                .collect()
        }),
        supplies: kind.includes_supplies().then(|| {
            snapshot
                .supplies
                .iter()
                .map(|(id, s)| (id.clone(), SupplyRecord::from(s)))
                .collect()
        }),
        usage_records: kind.includes_usage().then(|| {
            snapshot
                .usage_records
                .iter()
                .map(|(id, u)| (id.clone(), UsageRecordDoc::from(u)))
                .collect()
        }),
    }
}

/// 导出文件名（嵌入导出时刻，避免重名）
pub fn snapshot_file_name(kind: EntityKind, at: &DateTime<Utc>) -> String {
    format!("{}_{}.json", file_stamp(at), kind.as_str())
}

/// 写出文档到目录，返回文件路径
pub fn write_snapshot(
    doc: &SnapshotDocument,
    dir: &Path,
    kind: EntityKind,
    at: &DateTime<Utc>,
) -> ImportResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| ImportError::access(dir, e))?;
    let path = dir.join(snapshot_file_name(kind, at));
    let body = serde_json::to_string_pretty(doc)
        .map_err(|e| ImportError::MalformedDocument(e.to_string()))?;
    fs::write(&path, body).map_err(|e| ImportError::access(&path, e))?;
    info!(path = %path.display(), kind = %kind, "快照已导出");
    Ok(path)
}

// ==========================================
// 导入
// ==========================================

/// 解析文档文本
pub fn parse_snapshot(text: &str) -> ImportResult<SnapshotDocument> {
    serde_json::from_str(text).map_err(|e| ImportError::MalformedDocument(e.to_string()))
}

/// 读取并解析文档
///
/// # 参数
/// - path: None 表示调用方取消了选择
pub fn read_snapshot(path: Option<&Path>) -> ImportResult<SnapshotDocument> {
    let path = path.ok_or(ImportError::NoSourceSelected)?;
    let text = fs::read_to_string(path).map_err(|e| ImportError::access(path, e))?;
    debug!(path = %path.display(), bytes = text.len(), "读取快照文件");
    parse_snapshot(&text)
}

/// 文档 → 实体集合（缺失的 created_at / used_at 以当前时间填充）
pub fn import_snapshot(doc: SnapshotDocument, clock: &dyn Clock) -> ImportResult<EntitySnapshot> {
    let now = clock.now();
    let mut snapshot = EntitySnapshot::default();

    for (key, record) in doc.suppliers.unwrap_or_default() {
        let id = resolve_id(&key, record.id.as_deref())?;
        let created_at = resolve_timestamp(&key, record.created_at.as_deref(), now)?;
        let supplier = Supplier::new(id, &record.name, &record.email, created_at)
            .map_err(|e| invalid_record(&key, e))?;
        snapshot.suppliers.insert(key, supplier);
    }

    for (key, record) in doc.supplies.unwrap_or_default() {
        let id = resolve_id(&key, record.id.as_deref())?;
        let created_at = resolve_timestamp(&key, record.created_at.as_deref(), now)?;
        let supply_type = match record.supply_type.as_deref() {
            None => SupplyType::Other,
            Some(raw) => raw.parse::<SupplyType>().map_err(|e| invalid_record(&key, e))?,
        };
        let expiration_date = match record.expiration_date.as_deref() {
            None => None,
            Some(text) if text.trim().is_empty() => None,
            Some(text) => Some(parse_date(text).ok_or_else(|| {
                ImportError::MalformedDocument(format!("{}: 无法识别的日期 {}", key, text))
            })?),
        };
        let supply = Supply::new(
            id,
            &record.name,
            record.quantity,
            &record.supplier_id,
            supply_type,
            created_at,
        )
        .map_err(|e| invalid_record(&key, e))?
        .with_expiration_date(expiration_date);
        snapshot.supplies.insert(key, supply);
    }

    for (key, record) in doc.usage_records.unwrap_or_default() {
        let id = resolve_id(&key, record.id.as_deref())?;
        let used_at = resolve_timestamp(&key, record.used_at.as_deref(), now)?;
        let usage = UsageRecord::new(
            id,
            &record.supply_id,
            record.quantity_used,
            &record.area,
            used_at,
        )
        .map_err(|e| invalid_record(&key, e))?;
        snapshot.usage_records.insert(key, usage);
    }

    Ok(snapshot)
}

fn invalid_record(key: &str, err: ValidationError) -> ImportError {
    ImportError::MalformedDocument(format!("{}: {}", key, err))
}

fn resolve_id(key: &str, id: Option<&str>) -> ImportResult<String> {
    match id {
        Some(id) if id != key => Err(ImportError::MalformedDocument(format!(
            "记录 id 与键不一致: key={}, id={}",
            key, id
        ))),
        _ => Ok(key.to_string()),
    }
}

fn resolve_timestamp(
    key: &str,
    raw: Option<&str>,
    now: DateTime<Utc>,
) -> ImportResult<DateTime<Utc>> {
    match raw {
        None => Ok(now),
        Some(text) => parse_timestamp(text).ok_or_else(|| {
            ImportError::MalformedDocument(format!("{}: 无法识别的时间 {}", key, text))
        }),
    }
}
