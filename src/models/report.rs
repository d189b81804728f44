//! 报告模型
//!
//! 一次成功上传的完整结果，创建后不可修改，下一次成功上传时整体替换。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::warn;

use super::wire::UploadResponse;

/// 单个医学指标：测量值 + 参考范围
///
/// 线上格式为 `[value, min, max]`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Indicator {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl From<[f64; 3]> for Indicator {
    fn from([value, min, max]: [f64; 3]) -> Self {
        Self { value, min, max }
    }
}

impl From<Indicator> for [f64; 3] {
    fn from(ind: Indicator) -> Self {
        [ind.value, ind.min, ind.max]
    }
}

impl Indicator {
    pub fn new(value: f64, min: f64, max: f64) -> Self {
        Self { value, min, max }
    }

    /// 从 JSON 值解析指标，不是三元数组时返回 None
    ///
    /// 服务端补全参考范围失败时会退回只有数值的结构，这类条目无法画出范围。
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() != 3 {
            return None;
        }
        let nums: Vec<f64> = items.iter().filter_map(JsonValue::as_f64).collect();
        match nums.as_slice() {
            [value, min, max] => Some(Self::new(*value, *min, *max)),
            _ => None,
        }
    }

    /// 测量值是否落在参考范围内（含边界）
    pub fn in_range(&self) -> bool {
        self.value >= self.min && self.value <= self.max
    }
}

/// 报告
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    original_content: String,
    explanation: String,
    indicators: BTreeMap<String, Indicator>,
    report_date: Option<String>,
    filename: Option<String>,
}

impl Report {
    pub fn new(original_content: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            original_content: original_content.into(),
            explanation: explanation.into(),
            indicators: BTreeMap::new(),
            report_date: None,
            filename: None,
        }
    }

    pub fn with_indicators(mut self, indicators: BTreeMap<String, Indicator>) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn with_report_date(mut self, date: impl Into<String>) -> Self {
        self.report_date = Some(date.into());
        self
    }

    /// 由上传接口的成功响应构建报告
    pub fn from_upload(response: UploadResponse) -> Self {
        let mut indicators = BTreeMap::new();
        for (name, raw) in response.indicators.unwrap_or_default() {
            match Indicator::from_json(&raw) {
                Some(ind) => {
                    indicators.insert(name, ind);
                }
                None => warn!("⚠️ 指标 {} 缺少参考范围，已忽略: {}", name, raw),
            }
        }

        Self {
            original_content: response.original_content,
            explanation: response.explanation,
            indicators,
            report_date: response.report_date.filter(|d| !d.trim().is_empty()),
            filename: response.filename,
        }
    }

    /// 报告原文（OCR 提取内容）
    pub fn original_content(&self) -> &str {
        &self.original_content
    }

    /// 原文语言的 AI 解读
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn indicators(&self) -> &BTreeMap<String, Indicator> {
        &self.indicators
    }

    pub fn report_date(&self) -> Option<&str> {
        self.report_date.as_deref()
    }

    /// 服务端保存的文件名
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }
}
