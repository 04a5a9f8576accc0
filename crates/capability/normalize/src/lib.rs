//! RawValueChange -> CanonicalReading 的转换。
//!
//! 转换是有损的：值与质量统一转为文本，时间截断到秒。下游依赖这一线上格式，
//! 修改前需同步消费方。

use chrono::{DateTime, TimeZone};
use domain::{CanonicalReading, RawValueChange};

/// 时间戳格式（本地时间，秒级）。
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 将一条变化通知转换为规范化读数，不会失败。
pub fn translate(change: &RawValueChange) -> CanonicalReading {
    CanonicalReading {
        t: change.tag_name.clone(),
        v: change.value.to_string(),
        dt: format_timestamp(&change.timestamp),
        q: change.quality.to_string(),
    }
}

/// 按秒级格式化时间戳，丢弃亚秒精度。
pub fn format_timestamp<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
