// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时目录/数据库、固定时钟、记录构造、故障注入后端
// ==========================================

#![allow(dead_code)]

use agri_supply::config::{AppConfig, BackendKind};
use agri_supply::domain::{Supplier, Supply, SupplyType, UsageRecord};
use agri_supply::identity::{parse_timestamp, FixedClock};
use agri_supply::repository::{
    PersistencePort, RepositoryError, RepositoryResult, WriteBatch,
};
use chrono::{DateTime, Utc};
use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 测试统一的"当前时间"
pub const TEST_NOW: &str = "2024-06-30 12:00:00";

pub fn test_now() -> DateTime<Utc> {
    parse_timestamp(TEST_NOW).unwrap()
}

/// 打开测试日志（可重复调用）
pub fn init_logging() {
    agri_supply::logging::init_test();
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(test_now()))
}

/// 创建临时数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();
    Ok((temp_file, db_path))
}

/// 指向临时目录的配置
pub fn test_config(dir: &Path, backend: BackendKind) -> AppConfig {
    AppConfig {
        backend,
        data_dir: dir.to_path_buf(),
        export_dir: Some(dir.join("exports")),
        ..AppConfig::default()
    }
}

pub fn supplier(id: &str, name: &str, email: &str) -> Supplier {
    Supplier::new(id, name, email, test_now()).unwrap()
}

/// 原始物资记录（不经构造函数，字段原样保留）
pub fn supply(
    id: &str,
    name: &str,
    quantity: u32,
    supplier_id: &str,
    supply_type: SupplyType,
) -> Supply {
    Supply {
        id: id.to_string(),
        name: name.to_string(),
        quantity,
        supplier_id: supplier_id.to_string(),
        supply_type,
        created_at: test_now(),
        expiration_date: None,
    }
}

pub fn usage(id: &str, supply_id: &str, quantity_used: u32, area: &str, at: &str) -> UsageRecord {
    UsageRecord::new(id, supply_id, quantity_used, area, parse_timestamp(at).unwrap()).unwrap()
}

// ==========================================
// FlakyPort - 可按需让写入失败的后端包装
// ==========================================
pub struct FlakyPort {
    inner: Box<dyn PersistencePort>,
    fail_apply: Arc<AtomicBool>,
}

impl FlakyPort {
    /// 返回包装后的后端与故障开关
    pub fn wrap(inner: Box<dyn PersistencePort>) -> (Self, Arc<AtomicBool>) {
        let switch = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner,
                fail_apply: Arc::clone(&switch),
            },
            switch,
        )
    }
}

impl PersistencePort for FlakyPort {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    fn fetch_suppliers(&self) -> RepositoryResult<Vec<Supplier>> {
        self.inner.fetch_suppliers()
    }

    fn fetch_supplies(&self) -> RepositoryResult<Vec<Supply>> {
        self.inner.fetch_supplies()
    }

    fn fetch_usage_records(&self) -> RepositoryResult<Vec<UsageRecord>> {
        self.inner.fetch_usage_records()
    }

    fn apply(&self, batch: &WriteBatch) -> RepositoryResult<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(RepositoryError::BackendUnavailable(
                "injected failure".to_string(),
            ));
        }
        self.inner.apply(batch)
    }
}
