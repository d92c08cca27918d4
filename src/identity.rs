// ==========================================
// 农资供应管理系统 - 标识与时钟服务
// ==========================================
// 职责: 生成实体唯一标识、提供统一的"当前时间"
// 约定: 时间统一为 UTC、精确到秒
// 存储格式: YYYY-MM-DD HH:MM:SS（日期: YYYY-MM-DD）
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use uuid::Uuid;

/// 持久化/交换统一使用的时间格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 日期格式（保质期、报表区间）
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 生成实体唯一 ID（UUID v4 字符串）
pub fn generate_unique_id() -> String {
    Uuid::new_v4().to_string()
}

// ==========================================
// Clock - 时钟抽象
// ==========================================
/// 时钟接口
///
/// 引擎中所有"当前时间"都从这里取得，测试中可替换为固定时钟。
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟（截断到秒，与存储精度一致）
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

/// 固定时钟（测试/回放用）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// 从 `YYYY-MM-DD HH:MM:SS` 构造，格式错误返回 None
    pub fn at(text: &str) -> Option<Self> {
        parse_timestamp(text).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ==========================================
// 时间格式化 / 解析
// ==========================================

/// 格式化为存储格式
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// 解析时间字符串
///
/// 依次尝试:
/// 1. `YYYY-MM-DD HH:MM:SS`（存储格式）
/// 2. RFC 3339（带时区）
/// 3. `YYYY-MM-DDTHH:MM:SS[.ffffff]`（无时区 ISO 8601）
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).trunc_subsecs(0));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive).trunc_subsecs(0))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 解析日期；也接受完整时间戳（取其 UTC 日期）
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(text).map(|ts| ts.date_naive()))
}

/// 导出文件名中的时间戳: ISO 8601 中的 ':' 与 '.' 替换为 '-'
///
/// 例: `2024-05-01T10:20:30.000000Z` → `2024-05-01T10-20-30-000000Z`
pub fn file_stamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
        .replace(':', "-")
        .replace('.', "-")
}

/// serde 适配: DateTime<Utc> <-> 存储格式字符串
pub mod timestamp_format {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("无法识别的时间格式: {}", raw)))
    }
}

/// serde 适配: Option<NaiveDate> <-> `YYYY-MM-DD` 或 null
pub mod optional_date_format {
    use super::{format_date, parse_date};
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&format_date(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_date(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("无法识别的日期格式: {}", raw))),
        }
    }
}
