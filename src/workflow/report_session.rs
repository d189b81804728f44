//! 报告会话 - 流程层
//!
//! 核心职责：把三个协调器串成"一份报告"的完整交互流程
//!
//! 流程顺序：
//! 1. 上传 → 重置下游（翻译缓存、问答记录、标签页）→ 等待解读
//! 2. 切换语言 → 命中缓存直接切换 / 否则翻译原文
//! 3. 提问 → 直接问答或 RAG → 写回问答记录
//!
//! 每个操作都拆成 `begin_*`（等待前的同步修改）和 `finish_*`（响应返回后应用），
//! 异步包装方法按 begin → await → finish 顺序执行。

use std::sync::Arc;
use tracing::info;

use crate::clients::ReportApi;
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, ValidationError};
use crate::models::{Report, ReportFile, RequestCtx, TranslateResponse, UploadResponse};
use crate::services::{
    LanguageTab, QaMode, QaOutcome, QaReply, QaSession, QaTicket, Selection, TranslationOutcome,
    TranslationSwitcher, TranslationTicket, UploadCoordinator, UploadOutcome, UploadTicket,
};

/// 报告会话
///
/// - 持有三个协调器，各自的状态只由各自修改
/// - `Report` 只由上传协调器写入，其余协调器只读
/// - 不持有任何网络资源，接口通过参数传入
pub struct ReportSession {
    upload: UploadCoordinator,
    translation: TranslationSwitcher,
    qa: QaSession,
    languages: Vec<String>,
}

impl ReportSession {
    /// 创建新的报告会话
    pub fn new(config: &Config) -> Self {
        Self {
            upload: UploadCoordinator::new(config.max_upload_bytes),
            translation: TranslationSwitcher::new(),
            qa: QaSession::new(config.rag_enabled),
            languages: config.translation_languages.clone(),
        }
    }

    /// 当前可用的报告
    ///
    /// 结果视图隐藏时（上传中或上传失败后）视为没有报告，
    /// 翻译、问答和导出都以此为准。
    pub fn report(&self) -> Option<&Arc<Report>> {
        self.upload
            .report()
            .filter(|_| self.upload.results_visible())
    }

    pub fn upload(&self) -> &UploadCoordinator {
        &self.upload
    }

    pub fn translation(&self) -> &TranslationSwitcher {
        &self.translation
    }

    pub fn qa(&self) -> &QaSession {
        &self.qa
    }

    /// 问答开关、输入框等界面状态
    pub fn qa_mut(&mut self) -> &mut QaSession {
        &mut self.qa
    }

    /// 可选语言（第一个为原文）
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    // ========== 上传 ==========

    /// 开始上传：校验通过后立即重置下游状态
    pub fn begin_upload(&mut self, file: Option<ReportFile>) -> Result<UploadTicket, ValidationError> {
        let ticket = self.upload.begin(file)?;
        self.translation.reset();
        self.qa.new_chat();
        Ok(ticket)
    }

    /// 应用上传响应，成功时以新报告为翻译缓存的种子
    pub fn finish_upload(
        &mut self,
        ctx: RequestCtx,
        result: Result<UploadResponse, ApiError>,
    ) -> UploadOutcome {
        let outcome = self.upload.finish(ctx, result);
        if let UploadOutcome::Loaded(report) = &outcome {
            self.translation.load(report.clone());
        }
        outcome
    }

    /// 上传报告
    pub async fn submit_upload(
        &mut self,
        api: &dyn ReportApi,
        file: Option<ReportFile>,
    ) -> Result<UploadOutcome, ValidationError> {
        let ticket = self.begin_upload(file)?;
        let result = api.upload(&ticket.file).await;
        Ok(self.finish_upload(ticket.ctx, result))
    }

    // ========== 翻译 ==========

    /// 选择语言（第一阶段）
    pub fn begin_translation(&mut self, language: &str) -> Result<Selection, ValidationError> {
        self.translation.select(language)
    }

    /// 应用翻译响应
    pub fn finish_translation(
        &mut self,
        ticket: &TranslationTicket,
        result: Result<TranslateResponse, ApiError>,
    ) -> TranslationOutcome {
        self.translation.finish(ticket.ctx, &ticket.language, result)
    }

    /// 切换解读语言
    pub async fn select_language(
        &mut self,
        api: &dyn ReportApi,
        language: &str,
    ) -> Result<TranslationOutcome, ValidationError> {
        match self.begin_translation(language)? {
            Selection::Done(outcome) => Ok(outcome),
            Selection::Fetch(ticket) => {
                let result = api.translate(&ticket.request).await;
                Ok(self.finish_translation(&ticket, result))
            }
        }
    }

    /// 取得某种语言的解读文本，必要时发起翻译
    pub async fn ensure_translation(
        &mut self,
        api: &dyn ReportApi,
        language: &str,
    ) -> AppResult<String> {
        if let Some(text) = self.translation.cached(language) {
            return Ok(text.to_string());
        }

        match self.select_language(api, language).await? {
            TranslationOutcome::Failed { message, .. } => Err(AppError::Other(message)),
            _ => self
                .translation
                .cached(language)
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::Other(format!(
                        "translation to {} is not available",
                        LanguageTab::parse(language).language()
                    ))
                }),
        }
    }

    // ========== 问答 ==========

    /// 提问（第一阶段）
    pub fn begin_question(&mut self, question: &str) -> Result<QaTicket, ValidationError> {
        let report = self.report().cloned();
        self.qa.begin(report.as_deref(), question)
    }

    /// 应用回答
    pub fn finish_question(
        &mut self,
        ticket: &QaTicket,
        result: Result<QaReply, ApiError>,
    ) -> QaOutcome {
        self.qa.finish(ticket.ctx, ticket.turn_id, result)
    }

    /// 提问并等待回答，失败会写入问答记录而不是返回错误
    pub async fn ask(
        &mut self,
        api: &dyn ReportApi,
        question: &str,
    ) -> Result<QaOutcome, ValidationError> {
        let ticket = self.begin_question(question)?;
        let result = match ticket.mode {
            QaMode::Direct => api.ask(&ticket.request).await.map(QaReply::Direct),
            QaMode::Rag => api.rag_enhance(&ticket.request).await.map(QaReply::Rag),
        };
        Ok(self.finish_question(&ticket, result))
    }

    /// 提交输入框中的问题
    pub async fn ask_draft(&mut self, api: &dyn ReportApi) -> Result<QaOutcome, ValidationError> {
        let question = self.qa.draft().to_string();
        self.ask(api, &question).await
    }

    // ========== 导出 ==========

    /// 导出当前报告的指标为 CSV
    pub async fn export_indicators(&self, api: &dyn ReportApi) -> AppResult<String> {
        let report = self.report().ok_or(ValidationError::NoReport)?;
        if report.indicators().is_empty() {
            return Err(ValidationError::NoIndicators.into());
        }

        info!("📦 正在导出 {} 项指标...", report.indicators().len());
        let csv = api.export_indicators(report.indicators()).await?;
        Ok(csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{Endpoint, ScriptedApi};
    use crate::services::{Answer, TranslationState};
    use serde_json::json;

    fn session() -> ReportSession {
        ReportSession::new(&Config::default())
    }

    fn scan() -> Option<ReportFile> {
        Some(ReportFile::new("scan.png", vec![1, 2, 3]))
    }

    fn upload_ok(api: &ScriptedApi, explanation: &str) {
        api.push_json(
            Endpoint::Upload,
            json!({
                "success": true,
                "original_content": "Glucose 95 mg/dL",
                "explanation": explanation,
                "indicators": { "Glucose": [95, 70, 100] },
                "report_date": "2024-03-01"
            }),
        );
    }

    #[tokio::test]
    async fn begin_upload_resets_downstream_before_response() {
        let api = ScriptedApi::new();
        upload_ok(&api, "first");
        api.push_json(
            Endpoint::Translate,
            json!({ "success": true, "translated_text": "第一" }),
        );
        api.push_json(Endpoint::Ask, json!({ "success": true, "answer": "ok" }));

        let mut session = session();
        session.submit_upload(&api, scan()).await.unwrap();
        session.select_language(&api, "Chinese").await.unwrap();
        session.ask(&api, "why?").await.unwrap();
        assert_eq!(session.qa().transcript().len(), 1);

        let ticket = session.begin_upload(scan()).unwrap();
        assert!(session.upload().is_busy());
        assert!(session.qa().transcript().is_empty());
        assert_eq!(session.translation().active(), &LanguageTab::Original);
        assert!(session.translation().cache().is_none());
        assert!(!session.upload().results_visible());

        session.finish_upload(
            ticket.ctx,
            Err(ApiError::Rejected {
                endpoint: "/upload".into(),
                message: "unreadable image".into(),
            }),
        );
        assert_eq!(session.upload().report().unwrap().explanation(), "first");
        assert!(session.report().is_none());
    }

    #[tokio::test]
    async fn validation_failure_leaves_everything_untouched() {
        let api = ScriptedApi::new();
        upload_ok(&api, "first");
        api.push_json(Endpoint::Ask, json!({ "success": true, "answer": "ok" }));

        let mut session = session();
        session.submit_upload(&api, scan()).await.unwrap();
        session.ask(&api, "why?").await.unwrap();

        let err = session.submit_upload(&api, None).await.unwrap_err();
        assert_eq!(err, ValidationError::NoFileSelected);
        assert_eq!(session.qa().transcript().len(), 1);
        assert!(session.upload().results_visible());
        assert_eq!(api.call_count(Endpoint::Upload), 1);
    }

    #[tokio::test]
    async fn in_flight_translation_from_previous_report_is_dropped() {
        let api = ScriptedApi::new();
        upload_ok(&api, "first");
        upload_ok(&api, "second");

        let mut session = session();
        session.submit_upload(&api, scan()).await.unwrap();

        let ticket = match session.begin_translation("Spanish").unwrap() {
            Selection::Fetch(ticket) => ticket,
            other => panic!("unexpected: {:?}", other),
        };
        session.submit_upload(&api, scan()).await.unwrap();

        let outcome = session.finish_translation(
            &ticket,
            Ok(TranslateResponse {
                translated_text: "primero".into(),
            }),
        );
        assert_eq!(outcome, TranslationOutcome::Stale);
        assert_eq!(
            session.translation().state("Spanish"),
            TranslationState::Absent
        );
        assert_eq!(session.translation().active_text(), Some("second"));
    }

    #[tokio::test]
    async fn in_flight_answer_from_previous_report_is_dropped() {
        let api = ScriptedApi::new();
        upload_ok(&api, "first");
        upload_ok(&api, "second");

        let mut session = session();
        session.submit_upload(&api, scan()).await.unwrap();
        let ticket = session.begin_question("why?").unwrap();

        session.submit_upload(&api, scan()).await.unwrap();
        let outcome = session.finish_question(
            &ticket,
            Ok(QaReply::Direct(crate::models::AskResponse {
                answer: "late".into(),
            })),
        );

        assert_eq!(outcome, QaOutcome::Stale);
        assert!(session.qa().transcript().is_empty());
    }

    #[tokio::test]
    async fn ensure_translation_fetches_once() {
        let api = ScriptedApi::new();
        upload_ok(&api, "All good.");
        api.push_json(
            Endpoint::Translate,
            json!({ "success": true, "translated_text": "Todo bien." }),
        );

        let mut session = session();
        session.submit_upload(&api, scan()).await.unwrap();

        assert_eq!(
            session.ensure_translation(&api, "Spanish").await.unwrap(),
            "Todo bien."
        );
        assert_eq!(
            session.ensure_translation(&api, "spanish").await.unwrap(),
            "Todo bien."
        );
        assert_eq!(
            session.ensure_translation(&api, "original").await.unwrap(),
            "All good."
        );
        assert_eq!(api.call_count(Endpoint::Translate), 1);
    }

    #[tokio::test]
    async fn ask_draft_uses_and_clears_input() {
        let api = ScriptedApi::new();
        upload_ok(&api, "first");
        api.push_transport_error(Endpoint::Ask, "connection reset");

        let mut session = session();
        session.submit_upload(&api, scan()).await.unwrap();
        session.qa_mut().set_draft("What is glucose?");

        let outcome = session.ask_draft(&api).await.unwrap();
        assert!(matches!(outcome, QaOutcome::Failed { .. }));
        assert_eq!(session.qa().draft(), "");
        assert_eq!(
            session.qa().transcript().latest().unwrap().answer,
            Some(Answer::Error("Error: connection reset".into()))
        );
    }

    #[tokio::test]
    async fn failed_reupload_hides_previous_report_everywhere() {
        let api = ScriptedApi::new();
        upload_ok(&api, "OLD");
        api.push_rejection(Endpoint::Upload, "unreadable image");

        let mut session = session();
        session.submit_upload(&api, scan()).await.unwrap();
        let outcome = session.submit_upload(&api, scan()).await.unwrap();
        assert!(matches!(outcome, UploadOutcome::Failed(_)));
        assert!(!session.upload().results_visible());

        assert_eq!(
            session.select_language(&api, "Chinese").await.unwrap_err(),
            ValidationError::NoExplanation
        );
        assert_eq!(
            session.ask(&api, "what?").await.unwrap_err(),
            ValidationError::NoReport
        );
        let err = session.export_indicators(&api).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::NoReport)));

        assert!(session.qa().transcript().is_empty());
        assert_eq!(api.call_count(Endpoint::Translate), 0);
        assert_eq!(api.call_count(Endpoint::Ask), 0);
        assert_eq!(api.call_count(Endpoint::ExportIndicators), 0);
    }

    #[tokio::test]
    async fn export_requires_indicators() {
        let api = ScriptedApi::new();
        let session = session();
        let err = session.export_indicators(&api).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::NoReport)));
        assert_eq!(api.call_count(Endpoint::ExportIndicators), 0);
    }

    #[tokio::test]
    async fn export_sends_current_indicators() {
        let api = ScriptedApi::new();
        upload_ok(&api, "first");
        api.push_text(Endpoint::ExportIndicators, "Indicator,Value\r\n");

        let mut session = session();
        session.submit_upload(&api, scan()).await.unwrap();
        let csv = session.export_indicators(&api).await.unwrap();

        assert_eq!(csv, "Indicator,Value\r\n");
        assert_eq!(
            api.last_payload(Endpoint::ExportIndicators).unwrap(),
            json!({ "indicators": { "Glucose": [95.0, 70.0, 100.0] } })
        );
    }
}
