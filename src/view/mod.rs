//! 视图层
//!
//! 只读取协调器的状态并生成文本，从不反向读取渲染结果作为状态。

pub mod indicator;
pub mod render;

pub use indicator::{IndicatorStatus, RangeDisplay, Severity};
pub use render::{
    format_references_markdown, render_explanation, render_indicators, render_references,
    render_report_summary, render_transcript,
};
