// ==========================================
// 农资供应管理系统 - 导入导出桥
// ==========================================
// 职责: EntitySnapshot <-> JSON 交换文档
// 文件名: <时间戳(':' '.' 替换为 '-')>_<suppliers|supplies|usage|inventory>.json
// ==========================================

pub mod error;
pub mod snapshot;

pub use error::{ImportError, ImportResult};
pub use snapshot::{
    export_snapshot, import_snapshot, parse_snapshot, read_snapshot, snapshot_file_name,
    write_snapshot, EntityKind, SnapshotDocument, SupplierRecord, SupplyRecord,
    UsageRecordDoc,
};
