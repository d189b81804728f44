//! 问答服务 - 业务能力层
//!
//! 只负责"围绕当前报告提问"能力：维护问答记录、待回答槽位和参考文献面板

use tracing::{debug, info, warn};

use crate::error::{ApiError, ValidationError};
use crate::models::{
    AskResponse, GenerationCounter, QuestionRequest, RagResponse, Reference, Report, RequestCtx,
    RequestKind,
};

/// 新会话的欢迎语
pub const GREETING: &str = "Hello! I'm your medical AI assistant. I can help explain your test results or answer any questions you might have about them.";

/// 问答记录中一轮的编号
pub type TurnId = u64;

/// 问答模式（提交时确定，之后切换开关不影响已发出的问题）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaMode {
    /// `/ask`
    Direct,
    /// `/rag-enhance`
    Rag,
}

/// 一轮的回答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    /// 以 `Error: ` 开头的失败信息
    Error(String),
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Text(text) | Answer::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Answer::Error(_))
    }
}

/// 问答记录中的一轮
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub question: String,
    pub mode: QaMode,
    /// `None` 表示仍在等待回答
    pub answer: Option<Answer>,
}

impl Turn {
    pub fn is_pending(&self) -> bool {
        self.answer.is_none()
    }
}

/// 问答记录
///
/// 同一时间最多一个待回答的轮次，由 `pending` 显式指向。
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    pending: Option<TurnId>,
    references: Option<Vec<Reference>>,
    next_id: TurnId,
}

impl Transcript {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// 当前待回答的轮次
    pub fn pending(&self) -> Option<&Turn> {
        let id = self.pending?;
        self.turns.iter().find(|t| t.id == id)
    }

    /// 最新一轮（视图滚动到这里）
    pub fn latest(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// 参考文献面板，`None` 表示隐藏
    pub fn references(&self) -> Option<&[Reference]> {
        self.references.as_deref()
    }

    /// 已完成的轮次数
    pub fn completed_count(&self) -> usize {
        self.turns.iter().filter(|t| !t.is_pending()).count()
    }

    /// 追加一个待回答的问题
    fn push_pending(&mut self, question: String, mode: QaMode) -> Result<TurnId, ValidationError> {
        if self.pending.is_some() {
            return Err(ValidationError::QuestionPending);
        }
        self.next_id += 1;
        let id = self.next_id;
        self.turns.push(Turn {
            id,
            question,
            mode,
            answer: None,
        });
        self.pending = Some(id);
        Ok(id)
    }

    /// 完成待回答的轮次；编号不是当前待回答轮次时返回 false
    fn complete(&mut self, id: TurnId, answer: Answer, references: Option<Vec<Reference>>) -> bool {
        if self.pending != Some(id) {
            return false;
        }
        let Some(turn) = self.turns.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        turn.answer = Some(answer);
        self.pending = None;
        self.references = references;
        true
    }

    fn clear(&mut self) {
        self.turns.clear();
        self.pending = None;
        self.references = None;
    }
}

/// 问答接口的成功响应
#[derive(Debug, Clone)]
pub enum QaReply {
    Direct(AskResponse),
    Rag(RagResponse),
}

/// 一次待发送的提问
#[derive(Debug, Clone)]
pub struct QaTicket {
    pub ctx: RequestCtx,
    pub turn_id: TurnId,
    pub mode: QaMode,
    pub request: QuestionRequest,
}

/// 提问结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QaOutcome {
    /// 已写入回答
    Answered(TurnId),
    /// 已写入错误信息
    Failed { turn_id: TurnId, message: String },
    /// 问答记录已被重置，响应丢弃
    Stale,
}

/// 问答会话
///
/// 职责：
/// - 校验问题并立即追加待回答轮次
/// - 按提交时的 RAG 开关选择接口
/// - 把回答 / 错误写回同一轮，失败不向外传播
pub struct QaSession {
    transcript: Transcript,
    rag_enabled: bool,
    draft: String,
    busy: bool,
    generations: GenerationCounter,
}

impl QaSession {
    /// 创建新的问答会话
    pub fn new(rag_enabled: bool) -> Self {
        Self {
            transcript: Transcript::default(),
            rag_enabled,
            draft: String::new(),
            busy: false,
            generations: GenerationCounter::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn greeting(&self) -> &'static str {
        GREETING
    }

    pub fn rag_enabled(&self) -> bool {
        self.rag_enabled
    }

    /// 切换 RAG 开关，只影响之后提交的问题
    pub fn set_rag_enabled(&mut self, enabled: bool) {
        self.rag_enabled = enabled;
    }

    /// 是否在等待回答（提问按钮禁用）
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// 输入框内容
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// 开始新对话：清空记录与参考文献，进行中的回答作废
    pub fn new_chat(&mut self) {
        self.transcript.clear();
        self.draft.clear();
        self.busy = false;
        self.generations.advance();
        debug!("问答记录已重置");
    }

    /// 提问（第一阶段）
    ///
    /// 校验通过后立即追加待回答轮次、清空输入框并进入忙碌状态。
    pub fn begin(
        &mut self,
        report: Option<&Report>,
        question: &str,
    ) -> Result<QaTicket, ValidationError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }
        let report = report.ok_or(ValidationError::NoReport)?;

        let mode = if self.rag_enabled {
            QaMode::Rag
        } else {
            QaMode::Direct
        };
        let turn_id = self.transcript.push_pending(question.to_string(), mode)?;

        self.draft.clear();
        self.busy = true;
        let ctx = RequestCtx::new(RequestKind::Question, self.generations.current());

        info!(
            "{} 💬 提问 #{} ({}): {}",
            ctx,
            turn_id,
            if mode == QaMode::Rag { "RAG" } else { "直接" },
            crate::utils::truncate_text(question, 80)
        );

        Ok(QaTicket {
            ctx,
            turn_id,
            mode,
            request: QuestionRequest {
                report_content: report.original_content().to_string(),
                question: question.to_string(),
            },
        })
    }

    /// 提交输入框中的问题
    pub fn begin_draft(&mut self, report: Option<&Report>) -> Result<QaTicket, ValidationError> {
        let question = self.draft.clone();
        self.begin(report, &question)
    }

    /// 应用回答（第二阶段）
    pub fn finish(
        &mut self,
        ctx: RequestCtx,
        turn_id: TurnId,
        result: Result<QaReply, ApiError>,
    ) -> QaOutcome {
        if !self.generations.is_current(ctx.generation) {
            debug!("{} 回答已过期，丢弃", ctx);
            return QaOutcome::Stale;
        }
        self.busy = false;

        let (answer, references) = match result {
            Ok(QaReply::Direct(response)) => (Answer::Text(response.answer), None),
            Ok(QaReply::Rag(response)) => {
                let references = response.references.filter(|refs| !refs.is_empty());
                (Answer::Text(response.enhanced_explanation), references)
            }
            Err(error) => {
                warn!("{} ⚠️ 问答失败: {}", ctx, error);
                (Answer::Error(format!("Error: {}", error)), None)
            }
        };

        let failed = answer.is_error().then(|| answer.text().to_string());
        if !self.transcript.complete(turn_id, answer, references) {
            warn!("{} 轮次 #{} 不是待回答轮次，丢弃", ctx, turn_id);
            return QaOutcome::Stale;
        }

        match failed {
            Some(message) => QaOutcome::Failed { turn_id, message },
            None => {
                info!("{} ✓ 轮次 #{} 已回答", ctx, turn_id);
                QaOutcome::Answered(turn_id)
            }
        }
    }
}
