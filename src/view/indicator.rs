//! 指标范围展示
//!
//! 把 `[value, min, max]` 映射到 0–100 的刻度上，两端各留出 10% 的余量，
//! 并根据测量值的位置给出分类和提示等级。

use crate::models::Indicator;

/// 两端余量占总跨度的比例
const DISPLAY_BUFFER: f64 = 0.1;
/// 距离参考范围边界多近算"临界"（占范围宽度的比例）
const CAUTION_OFFSET: f64 = 0.2;

/// 测量值相对参考范围的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorStatus {
    Low,
    Normal,
    High,
}

/// 提示等级（决定滑块颜色）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// 范围中部
    Normal,
    /// 在范围内但靠近边界
    Caution,
    /// 超出范围
    Danger,
}

impl Severity {
    /// 网页版使用的颜色
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Normal => "#2e7d32",
            Severity::Caution => "#f9a825",
            Severity::Danger => "#e53935",
        }
    }

    fn marker(&self) -> char {
        match self {
            Severity::Normal => '●',
            Severity::Caution => '▲',
            Severity::Danger => '✖',
        }
    }
}

/// 指标分类
pub fn classify(indicator: &Indicator) -> IndicatorStatus {
    if indicator.in_range() {
        IndicatorStatus::Normal
    } else if indicator.value < indicator.min {
        IndicatorStatus::Low
    } else {
        IndicatorStatus::High
    }
}

/// 提示等级
pub fn severity(indicator: &Indicator) -> Severity {
    if classify(indicator) != IndicatorStatus::Normal {
        return Severity::Danger;
    }
    let threshold = (indicator.max - indicator.min) * CAUTION_OFFSET;
    if indicator.value - indicator.min < threshold || indicator.max - indicator.value < threshold {
        Severity::Caution
    } else {
        Severity::Normal
    }
}

/// 一个指标在刻度上的位置（0–100）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeDisplay {
    pub min_pos: f64,
    pub value_pos: f64,
    pub max_pos: f64,
    pub status: IndicatorStatus,
    pub severity: Severity,
}

impl RangeDisplay {
    pub fn new(indicator: &Indicator) -> Self {
        let actual_min = indicator.value.min(indicator.min);
        let actual_max = indicator.value.max(indicator.max);
        let buffer = (actual_max - actual_min) * DISPLAY_BUFFER;
        let display_min = actual_min - buffer;
        let display_range = (actual_max + buffer) - display_min;

        let position = |x: f64| {
            if display_range > 0.0 {
                (x - display_min) / display_range * 100.0
            } else {
                50.0
            }
        };

        Self {
            min_pos: position(indicator.min),
            value_pos: position(indicator.value),
            max_pos: position(indicator.max),
            status: classify(indicator),
            severity: severity(indicator),
        }
    }

    /// 画成一条宽度为 `width` 的文本刻度：`[` `]` 是参考范围，标记是测量值
    pub fn render_bar(&self, width: usize) -> String {
        let width = width.max(3);
        let slot = |pos: f64| -> usize {
            let idx = (pos / 100.0 * (width - 1) as f64).round();
            (idx.max(0.0) as usize).min(width - 1)
        };

        let mut cells = vec!['─'; width];
        cells[slot(self.min_pos)] = '[';
        cells[slot(self.max_pos)] = ']';
        cells[slot(self.value_pos)] = self.severity.marker();
        cells.into_iter().collect()
    }
}

/// 刻度标签，保留一位小数
pub fn format_mark(value: f64) -> String {
    format!("{:.1}", value)
}
