use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// Envelope 的固定名称。
pub const ENVELOPE_NAME: &str = "Historian";

/// 点位值（来自 historian 的无类型标量，在边界处收敛为封闭枚举）。
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    I64(i64),
    F64(f64),
    Bool(bool),
    String(String),
}

/// 统一的字符串化规则：下游只接收文本，类型信息在此丢弃。
///
/// 线上格式沿用网关既有写法：布尔为 `True`/`False`，浮点为最短往返表示，
/// 十进制指数不在 (-5, 15) 区间时改用 `1E+20`、`1.5E-07` 形式。
impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::I64(v) => write!(f, "{}", v),
            TagValue::F64(v) => write_f64(f, *v),
            TagValue::Bool(true) => f.write_str("True"),
            TagValue::Bool(false) => f.write_str("False"),
            TagValue::String(v) => f.write_str(v),
        }
    }
}

fn write_f64(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        return f.write_str("NaN");
    }
    if value.is_infinite() {
        return f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if value == 0.0 {
        return write!(f, "{}", value);
    }
    // `{:e}` 给出最短往返的尾数与指数，如 "1.5e-7"
    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    if exponent > -5 && exponent < 15 {
        write!(f, "{}", value)
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(f, "{}E{}{:02}", mantissa, sign, exponent.abs())
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::I64(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::F64(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::String(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::String(value)
    }
}

/// 数据质量标记。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quality {
    Good,
    Bad,
    Uncertain,
    NotApplicable,
    /// 源端上报的其他质量码，原样透传。
    Other(String),
}

impl Quality {
    pub fn as_str(&self) -> &str {
        match self {
            Quality::Good => "good",
            Quality::Bad => "bad",
            Quality::Uncertain => "uncertain",
            Quality::NotApplicable => "not_applicable",
            Quality::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// historian 推送的单条变化通知。
#[derive(Debug, Clone, PartialEq)]
pub struct RawValueChange {
    pub tag_name: String,
    pub value: TagValue,
    /// 源端时间（本地时区）。
    pub timestamp: DateTime<Local>,
    pub quality: Quality,
}

impl RawValueChange {
    pub fn new(
        tag_name: impl Into<String>,
        value: impl Into<TagValue>,
        timestamp: DateTime<Local>,
        quality: Quality,
    ) -> Self {
        Self {
            tag_name: tag_name.into(),
            value: value.into(),
            timestamp,
            quality,
        }
    }
}

/// 规范化后的读数（线上格式字段名固定为 t/v/dt/q）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalReading {
    pub t: String,
    pub v: String,
    pub dt: String,
    pub q: String,
}

/// 发布信封：每次发布只携带一条读数。
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    pub name: &'static str,
    pub content: [&'a CanonicalReading; 1],
}

impl<'a> Envelope<'a> {
    pub fn single(reading: &'a CanonicalReading) -> Self {
        Self {
            name: ENVELOPE_NAME,
            content: [reading],
        }
    }
}
