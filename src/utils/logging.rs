use anyhow::Result;
/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;

/// 初始化会话日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n报告解读会话日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 向会话日志追加一行（带时间戳）
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `api_base_url`: 报告分析服务地址
/// - `rag_enabled`: 是否默认启用 RAG
pub fn log_startup(api_base_url: &str, rag_enabled: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 医疗报告解读客户端");
    info!("🌐 服务地址: {}", api_base_url);
    info!("📚 RAG 默认: {}", if rag_enabled { "开启" } else { "关闭" });
    info!("{}", "=".repeat(60));
}

/// 记录报告加载信息
///
/// # 参数
/// - `file_name`: 上传的文件名
/// - `indicator_count`: 指标数量
/// - `content_len`: 报告原文长度
pub fn log_report_loaded(file_name: &str, indicator_count: usize, content_len: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 报告解析完成: {}", file_name);
    info!("📊 指标数量: {} | 原文长度: {} 字符", indicator_count, content_len);
    info!("{}", "─".repeat(60));
}

/// 打印会话统计信息
///
/// # 参数
/// - `uploads`: 成功上传次数
/// - `questions`: 已回答的问题数
/// - `translations`: 已缓存的翻译数
/// - `log_file_path`: 日志文件路径
pub fn print_session_stats(uploads: usize, questions: usize, translations: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 会话结束统计");
    info!(
        "结束时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 报告: {}", uploads);
    info!("💬 问答: {}", questions);
    info!("🌐 翻译: {}", translations);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
