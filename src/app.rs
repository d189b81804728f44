use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::clients::{ReportApi, ReportClient};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::load_report_file;
use crate::services::{QaOutcome, TranslationOutcome, UploadOutcome};
use crate::utils::logging::{
    append_log_line, init_log_file, log_report_loaded, log_startup, print_session_stats,
};
use crate::view;
use crate::workflow::ReportSession;

const HELP: &str = "\
命令:
  upload <图片路径>   上传报告
  lang <语言>         切换解读语言（original / Chinese / Spanish ...）
  rag on|off          开关 RAG 增强问答
  new                 新建对话
  export <csv路径>    导出指标
  show                重新显示报告
  help                显示帮助
  quit                退出
其他输入都作为问题提交。";

/// 一行输入对应的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(Option<PathBuf>),
    Language(String),
    Rag(bool),
    NewChat,
    Export(PathBuf),
    Show,
    Help,
    Quit,
    Ask(String),
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_ascii_lowercase().as_str() {
            "upload" => Command::Upload((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "lang" if !rest.is_empty() => Command::Language(rest.to_string()),
            "lang" => Command::Invalid("用法: lang <语言>".into()),
            "rag" => match rest.to_ascii_lowercase().as_str() {
                "on" => Command::Rag(true),
                "off" => Command::Rag(false),
                _ => Command::Invalid("用法: rag on|off".into()),
            },
            "new" if rest.is_empty() => Command::NewChat,
            "export" if !rest.is_empty() => Command::Export(PathBuf::from(rest)),
            "export" => Command::Invalid("用法: export <csv路径>".into()),
            "show" if rest.is_empty() => Command::Show,
            "help" if rest.is_empty() => Command::Help,
            "quit" | "exit" if rest.is_empty() => Command::Quit,
            _ => Command::Ask(line.to_string()),
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    client: ReportClient,
    session: ReportSession,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config.api_base_url, config.rag_enabled);

        let client = ReportClient::new(&config)?;
        let session = ReportSession::new(&config);

        Ok(Self {
            config,
            client,
            session,
        })
    }

    /// 读取标准输入直到 `quit` 或 EOF
    pub async fn run(&mut self) -> Result<()> {
        println!("{}", self.session.qa().greeting());
        println!("{}", HELP);

        let client = self.client.clone();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Command::Quit => break,
                command => {
                    if let Err(e) = self.dispatch(&client, command).await {
                        alert(&e);
                    }
                }
            }
        }

        self.finish();
        Ok(())
    }

    /// 执行一条命令，校验失败等以错误返回，由调用方提示
    pub async fn dispatch(&mut self, api: &dyn ReportApi, command: Command) -> AppResult<()> {
        match command {
            Command::Upload(path) => self.upload(api, path.as_deref()).await,
            Command::Language(language) => self.select_language(api, &language).await,
            Command::Rag(enabled) => {
                self.session.qa_mut().set_rag_enabled(enabled);
                println!("📚 RAG: {}", if enabled { "开启" } else { "关闭" });
                Ok(())
            }
            Command::NewChat => {
                self.session.qa_mut().new_chat();
                print!("{}", view::render_transcript(self.session.qa()));
                Ok(())
            }
            Command::Export(path) => self.export(api, &path).await,
            Command::Show => {
                self.show();
                Ok(())
            }
            Command::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Command::Ask(question) => self.ask(api, &question).await,
            Command::Invalid(usage) => {
                println!("{}", usage);
                Ok(())
            }
            Command::Quit => Ok(()),
        }
    }

    async fn upload(&mut self, api: &dyn ReportApi, path: Option<&Path>) -> AppResult<()> {
        let file = match path {
            Some(path) => Some(
                load_report_file(path)
                    .await
                    .map_err(|e| AppError::Other(format!("{:#}", e)))?,
            ),
            None => None,
        };
        let file_name = file.as_ref().map(|f| f.file_name.clone());

        println!("⏳ 正在分析报告...");
        match self.session.submit_upload(api, file).await? {
            UploadOutcome::Loaded(report) => {
                let name = file_name.unwrap_or_default();
                log_report_loaded(&name, report.indicators().len(), report.original_content().len());
                self.record(&format!("上传 {} 成功", name));
                self.show();
            }
            UploadOutcome::Failed(failure) => {
                let message = failure.user_message();
                self.record(&message);
                println!("❌ {}", message);
            }
            UploadOutcome::Stale => {}
        }
        Ok(())
    }

    async fn select_language(&mut self, api: &dyn ReportApi, language: &str) -> AppResult<()> {
        match self.session.select_language(api, language).await? {
            TranslationOutcome::Failed { message, .. } => {
                self.record(&message);
                println!("❌ {}", message);
            }
            TranslationOutcome::AlreadyPending(language) => {
                println!("⏳ {} 正在翻译中", language);
            }
            TranslationOutcome::Ready(language) => {
                self.record(&format!("翻译为 {}", language));
                self.print_explanation();
            }
            TranslationOutcome::Switched(_) | TranslationOutcome::Unchanged => {
                self.print_explanation();
            }
            TranslationOutcome::Stale => {}
        }
        Ok(())
    }

    async fn ask(&mut self, api: &dyn ReportApi, question: &str) -> AppResult<()> {
        self.session.qa_mut().set_draft(question);
        match self.session.ask_draft(api).await? {
            QaOutcome::Answered(_) => self.record(&format!("提问: {}", question)),
            QaOutcome::Failed { message, .. } => self.record(&message),
            QaOutcome::Stale => {}
        }
        print!("{}", view::render_transcript(self.session.qa()));
        Ok(())
    }

    async fn export(&mut self, api: &dyn ReportApi, path: &Path) -> AppResult<()> {
        let csv = self.session.export_indicators(api).await?;
        tokio::fs::write(path, csv)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        info!("✓ 指标已导出: {}", path.display());
        self.record(&format!("导出指标到 {}", path.display()));
        Ok(())
    }

    fn show(&self) {
        match self.session.report() {
            Some(report) if self.session.upload().results_visible() => {
                print!("{}", view::render_report_summary(report));
                print!("{}", view::render_indicators(report));
                self.print_explanation();
                print!("{}", view::render_transcript(self.session.qa()));
            }
            _ => println!("（尚未上传报告）"),
        }
    }

    fn print_explanation(&self) {
        print!(
            "{}",
            view::render_explanation(self.session.translation(), self.session.languages())
        );
    }

    fn record(&self, line: &str) {
        if let Err(e) = append_log_line(&self.config.output_log_file, line) {
            warn!("⚠️ 写入会话日志失败: {}", e);
        }
    }

    fn finish(&self) {
        let translations = self
            .session
            .translation()
            .cache()
            .map(|cache| cache.len().saturating_sub(1))
            .unwrap_or(0);
        print_session_stats(
            self.session.upload().loaded_count(),
            self.session.qa().transcript().completed_count(),
            translations,
            &self.config.output_log_file,
        );
    }
}

/// 向用户提示错误
fn alert(err: &AppError) {
    match err {
        AppError::Validation(e) => println!("⚠️  {}", e),
        other => {
            error!("❌ {}", other);
            println!("❌ {}", other);
        }
    }
}
