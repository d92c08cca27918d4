// ==========================================
// 农资供应管理系统 - 性能观测
// ==========================================
// PerfGuard: 记录一次操作的耗时与期间执行的 SQL 条数
// install_sqlite_tracing: 统计 SQL 条数 + 慢 SQL 日志
// 开关:
// - AGRI_SUPPLY_PERF_SQL=1 强制开启（Debug 默认开启）
// - AGRI_SUPPLY_SLOW_SQL_MS=50 慢 SQL 阈值（毫秒）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const PERF_SQL_ENV: &str = "AGRI_SUPPLY_PERF_SQL";
pub const SLOW_SQL_MS_ENV: &str = "AGRI_SUPPLY_SLOW_SQL_MS";

static SQL_TRACE_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static SQL_STATEMENTS: Cell<u64> = const { Cell::new(0) };
}

fn env_flag(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn shorten(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{cut}…")
}

/// 为连接安装 trace/profile 回调
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = match std::env::var(PERF_SQL_ENV) {
        Ok(v) => env_flag(&v),
        Err(_) => cfg!(debug_assertions),
    };
    SQL_TRACE_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var(SLOW_SQL_MS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(on_sql_trace));
    conn.profile(Some(on_sql_profile));
}

fn on_sql_trace(_sql: &str) {
    if SQL_TRACE_ENABLED.load(Ordering::Relaxed) {
        SQL_STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_sql_profile(sql: &str, duration: Duration) {
    if !SQL_TRACE_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %shorten(sql, 300),
            "slow sql"
        );
    }
}

/// 性能统计 Guard
///
/// ```ignore
/// let _perf = agri_supply::perf::PerfGuard::new("store.reload");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            sql_start: SQL_STATEMENTS.with(|c| c.get()),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let sql_count = SQL_STATEMENTS
            .with(|c| c.get())
            .saturating_sub(self.sql_start);
        tracing::debug!(target: "perf", op = self.op, elapsed_ms, sql_count, "done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_flag() {
        assert!(env_flag(" YES "));
        assert!(env_flag("1"));
        assert!(!env_flag("0"));
        assert!(!env_flag("off"));
    }

    #[test]
    fn test_shorten_collapses_whitespace() {
        assert_eq!(shorten("SELECT  *\n  FROM supply", 100), "SELECT * FROM supply");
        assert_eq!(shorten("abcdef", 3), "abc…");
    }
}
