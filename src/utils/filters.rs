//! 展示用的文本过滤器

use chrono::{DateTime, NaiveDate};

/// 空值占位符
pub const PLACEHOLDER: &str = "--";

/// 空值或空白字符串显示为 `--`
pub fn check_null(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// 把报告日期格式化为 `March 1, 2024`
///
/// 支持 `YYYY-MM-DD`、`YYYY/MM/DD` 与 RFC 3339，其余格式原样返回。
pub fn convert_date(date: Option<&str>) -> String {
    let raw = match date.map(str::trim) {
        Some(d) if !d.is_empty() => d,
        _ => return PLACEHOLDER.to_string(),
    };

    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()));

    match parsed {
        Some(d) => d.format("%B %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}
