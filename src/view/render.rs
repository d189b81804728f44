//! 终端渲染
//!
//! 每个函数都只接收状态的只读引用，返回要打印的文本。

use std::fmt::Write;

use crate::models::{Reference, Report};
use crate::services::{
    language_label, LanguageTab, QaMode, QaSession, TranslationState, TranslationSwitcher,
    ORIGINAL_LANGUAGE,
};
use crate::utils::{check_null, convert_date};
use crate::view::indicator::{format_mark, RangeDisplay};

const BAR_WIDTH: usize = 32;

/// 报告概要：文件名、日期、指标数
pub fn render_report_summary(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📄 文件: {}", check_null(report.filename()));
    let _ = writeln!(out, "📅 日期: {}", convert_date(report.report_date()));
    let _ = writeln!(out, "📊 指标: {} 项", report.indicators().len());
    out
}

/// 指标范围列表
pub fn render_indicators(report: &Report) -> String {
    if report.indicators().is_empty() {
        return "（无可展示的指标）\n".to_string();
    }

    let name_width = report
        .indicators()
        .keys()
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (name, indicator) in report.indicators() {
        let display = RangeDisplay::new(indicator);
        let _ = writeln!(
            out,
            "{:<width$}  {}  {} ({} – {}) {:?}",
            name,
            display.render_bar(BAR_WIDTH),
            format_mark(indicator.value),
            format_mark(indicator.min),
            format_mark(indicator.max),
            display.status,
            width = name_width,
        );
    }
    out
}

/// 解读区：标签页一行，下面是当前标签的文本
pub fn render_explanation(switcher: &TranslationSwitcher, languages: &[String]) -> String {
    let mut tabs = vec![LanguageTab::Original];
    tabs.extend(
        languages
            .iter()
            .filter(|language| language.as_str() != ORIGINAL_LANGUAGE)
            .map(|language| LanguageTab::Translated(language.clone())),
    );

    let labels: Vec<String> = tabs
        .iter()
        .map(|tab| {
            let label = language_label(tab.language());
            if tab == switcher.active() {
                format!("[{}]", label)
            } else if switcher.state(tab.language()) == TranslationState::Pending {
                format!(" {}… ", label)
            } else {
                format!(" {} ", label)
            }
        })
        .collect();

    let mut out = labels.join("|");
    out.push('\n');
    if switcher.is_loading() {
        out.push_str("⏳ 翻译中...\n");
    }
    match switcher.active_text() {
        Some(text) => {
            out.push_str(text);
            out.push('\n');
        }
        None => out.push_str("（尚未上传报告）\n"),
    }
    out
}

/// 问答记录，欢迎语在最前
pub fn render_transcript(qa: &QaSession) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🤖 {}", qa.greeting());

    for turn in qa.transcript().turns() {
        let tag = match turn.mode {
            QaMode::Direct => "",
            QaMode::Rag => " (RAG)",
        };
        let _ = writeln!(out, "🙋 {}{}", turn.question, tag);
        match &turn.answer {
            Some(answer) if answer.is_error() => {
                let _ = writeln!(out, "⚠️  {}", answer.text());
            }
            Some(answer) => {
                let _ = writeln!(out, "🤖 {}", answer.text());
            }
            None => out.push_str("🤖 ...\n"),
        }
    }

    if let Some(references) = qa.transcript().references() {
        out.push_str(&render_references(references));
    }
    out
}

/// 参考文献面板
pub fn render_references(references: &[Reference]) -> String {
    let mut out = String::from("📚 参考文献\n");
    for (i, reference) in references.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, reference.title);
        for line in reference.content.lines() {
            let _ = writeln!(out, "     {}", line);
        }
    }
    out
}

/// 参考文献的 Markdown 形式，标题和正文原样保留
pub fn format_references_markdown(references: &[Reference]) -> String {
    references
        .iter()
        .map(|reference| format!("### {}\n\n{}\n", reference.title, reference.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Indicator;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn report() -> Report {
        let mut indicators = BTreeMap::new();
        indicators.insert("Glucose".to_string(), Indicator::new(95.0, 70.0, 100.0));
        Report::new("Glucose 95 mg/dL", "Your glucose is normal.")
            .with_indicators(indicators)
            .with_report_date("2024-03-01")
    }

    #[test]
    fn summary_uses_placeholders_and_friendly_date() {
        let text = render_report_summary(&report());
        assert!(text.contains("文件: --"));
        assert!(text.contains("March 1, 2024"));
        assert!(text.contains("1 项"));
    }

    #[test]
    fn indicators_show_value_and_status() {
        let text = render_indicators(&report());
        assert!(text.contains("Glucose"));
        assert!(text.contains("95.0 (70.0 – 100.0) Normal"));
    }

    #[test]
    fn explanation_marks_active_tab() {
        let mut switcher = TranslationSwitcher::new();
        switcher.load(Arc::new(report()));
        let languages = vec!["English".to_string(), "Chinese".to_string()];

        let text = render_explanation(&switcher, &languages);
        let first_line = text.lines().next().unwrap();
        assert_eq!(first_line, "[English]| 中文 ");
        assert!(text.contains("Your glucose is normal."));
    }

    #[test]
    fn empty_transcript_shows_greeting_only() {
        let qa = QaSession::new(false);
        let text = render_transcript(&qa);
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("🤖 Hello!"));
    }

    #[test]
    fn references_keep_title_and_content_verbatim() {
        let references = vec![
            Reference {
                title: "ADA Standards of Care".into(),
                content: "Fasting glucose 70–99 mg/dL is normal.".into(),
            },
            Reference {
                title: "WHO Guideline".into(),
                content: "Impaired fasting glucose: 110–125 mg/dL.".into(),
            },
        ];

        let panel = render_references(&references);
        assert!(panel.contains("1. ADA Standards of Care"));
        assert!(panel.contains("2. WHO Guideline"));

        let markdown = format_references_markdown(&references);
        assert_eq!(
            markdown,
            "### ADA Standards of Care\n\nFasting glucose 70–99 mg/dL is normal.\n\n### WHO Guideline\n\nImpaired fasting glucose: 110–125 mg/dL.\n"
        );
    }
}
