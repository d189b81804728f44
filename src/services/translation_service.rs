//! 翻译服务 - 业务能力层
//!
//! 只负责"切换解读语言"能力：缓存已翻译文本、维护每种语言的状态和当前标签页

use phf::phf_map;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ValidationError};
use crate::models::{
    GenerationCounter, Report, RequestCtx, RequestKind, TranslateRequest, TranslateResponse,
};

/// 原文语言（解读默认以英文生成）
pub const ORIGINAL_LANGUAGE: &str = "English";

/// 语言 → 标签页显示名
static LANGUAGE_LABELS: phf::Map<&'static str, &'static str> = phf_map! {
    "English" => "English",
    "Chinese" => "中文",
    "Spanish" => "Español",
    "French" => "Français",
    "German" => "Deutsch",
    "Japanese" => "日本語",
    "Korean" => "한국어",
};

/// 语言的显示名，未登记的语言直接显示名称
pub fn language_label(language: &str) -> &str {
    LANGUAGE_LABELS.get(language).copied().unwrap_or(language)
}

/// 规范化语言名：`chinese` / `CHINESE` → `Chinese`
pub fn canonical_language(raw: &str) -> String {
    let raw = raw.trim();
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// 标签页（单选）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageTab {
    /// 原文解读
    Original,
    /// 某种译文
    Translated(String),
}

impl LanguageTab {
    /// 解析用户选择；`original` 与原文语言都指向原文标签
    pub fn parse(raw: &str) -> Self {
        let language = canonical_language(raw);
        if language == "Original" || language == ORIGINAL_LANGUAGE {
            LanguageTab::Original
        } else {
            LanguageTab::Translated(language)
        }
    }

    /// 对应的缓存键
    pub fn language(&self) -> &str {
        match self {
            LanguageTab::Original => ORIGINAL_LANGUAGE,
            LanguageTab::Translated(language) => language,
        }
    }
}

impl fmt::Display for LanguageTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(language_label(self.language()))
    }
}

/// 单个语言的翻译状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationState {
    /// 从未请求过（或上次请求失败）
    Absent,
    /// 请求进行中
    Pending,
    /// 已缓存，可直接切换
    Ready,
}

/// 翻译缓存
///
/// 始终包含原文语言条目；每个键只写入一次。
#[derive(Debug, Clone)]
pub struct TranslationCache {
    entries: HashMap<String, String>,
}

impl TranslationCache {
    pub fn new(explanation: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(ORIGINAL_LANGUAGE.to_string(), explanation.to_string());
        Self { entries }
    }

    pub fn get(&self, language: &str) -> Option<&str> {
        self.entries.get(language).map(String::as_str)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.entries.contains_key(language)
    }

    /// 写入译文，已存在的键不会被覆盖；返回是否写入
    pub fn insert_once(&mut self, language: &str, text: String) -> bool {
        if self.entries.contains_key(language) {
            return false;
        }
        self.entries.insert(language.to_string(), text);
        true
    }

    /// 条目数（含原文）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 一次待发送的翻译
#[derive(Debug, Clone)]
pub struct TranslationTicket {
    pub ctx: RequestCtx,
    pub language: String,
    pub request: TranslateRequest,
}

/// 选择语言的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    /// 选择的就是当前标签，什么也没发生
    Unchanged,
    /// 同步切换（原文或已缓存）
    Switched(LanguageTab),
    /// 该语言已在翻译中
    AlreadyPending(String),
    /// 翻译完成并切换
    Ready(String),
    /// 翻译失败，已回到原文
    Failed { language: String, message: String },
    /// 响应属于已被替换的报告，已丢弃
    Stale,
}

/// `select` 的第一阶段结果
#[derive(Debug, Clone)]
pub enum Selection {
    /// 无需网络请求，已处理完毕
    Done(TranslationOutcome),
    /// 需要发出翻译请求
    Fetch(TranslationTicket),
}

/// 翻译切换器
///
/// 职责：
/// - 持有当前报告的翻译缓存
/// - 维护 absent / pending / ready 三态和单选标签页
/// - 翻译请求始终以原文解读为源文本
pub struct TranslationSwitcher {
    source: Option<Arc<Report>>,
    cache: Option<TranslationCache>,
    pending: HashSet<String>,
    active: LanguageTab,
    generations: GenerationCounter,
}

impl TranslationSwitcher {
    /// 创建新的翻译切换器
    pub fn new() -> Self {
        Self {
            source: None,
            cache: None,
            pending: HashSet::new(),
            active: LanguageTab::Original,
            generations: GenerationCounter::default(),
        }
    }

    /// 清空缓存并回到原文标签，进行中的翻译全部作废
    pub fn reset(&mut self) {
        self.source = None;
        self.cache = None;
        self.pending.clear();
        self.active = LanguageTab::Original;
        self.generations.advance();
    }

    /// 绑定新报告，缓存以其原文解读为种子
    pub fn load(&mut self, report: Arc<Report>) {
        self.reset();
        self.cache = Some(TranslationCache::new(report.explanation()));
        self.source = Some(report);
    }

    pub fn active(&self) -> &LanguageTab {
        &self.active
    }

    /// 是否有翻译在进行中（显示加载指示）
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn cache(&self) -> Option<&TranslationCache> {
        self.cache.as_ref()
    }

    /// 某个语言当前的状态
    pub fn state(&self, language: &str) -> TranslationState {
        let tab = LanguageTab::parse(language);
        let key = tab.language();
        if self.cache.as_ref().is_some_and(|c| c.contains(key)) {
            TranslationState::Ready
        } else if self.pending.contains(key) {
            TranslationState::Pending
        } else {
            TranslationState::Absent
        }
    }

    /// 已缓存的文本
    pub fn cached(&self, language: &str) -> Option<&str> {
        let tab = LanguageTab::parse(language);
        self.cache.as_ref()?.get(tab.language())
    }

    /// 当前标签页应显示的文本
    pub fn active_text(&self) -> Option<&str> {
        self.cache.as_ref()?.get(self.active.language())
    }

    /// 选择语言（第一阶段）
    ///
    /// 原文或已缓存的语言直接切换；未请求过的语言进入 pending，
    /// 标签页保持不变，返回需要发送的请求。
    pub fn select(&mut self, language: &str) -> Result<Selection, ValidationError> {
        let (source, cache) = match (&self.source, &self.cache) {
            (Some(source), Some(cache)) => (source, cache),
            _ => return Err(ValidationError::NoExplanation),
        };

        let tab = LanguageTab::parse(language);
        if tab.language().is_empty() {
            return Err(ValidationError::NoLanguage);
        }
        if tab == self.active {
            return Ok(Selection::Done(TranslationOutcome::Unchanged));
        }

        let key = tab.language().to_string();
        if cache.contains(&key) {
            debug!("切换到已缓存的语言: {}", key);
            self.active = tab.clone();
            return Ok(Selection::Done(TranslationOutcome::Switched(tab)));
        }

        if self.pending.contains(&key) {
            return Ok(Selection::Done(TranslationOutcome::AlreadyPending(key)));
        }

        let request = TranslateRequest {
            text: source.explanation().to_string(),
            language: key.clone(),
        };
        self.pending.insert(key.clone());
        let ctx = RequestCtx::new(RequestKind::Translation, self.generations.current());

        info!("{} 🌐 正在翻译为 {}...", ctx, key);
        Ok(Selection::Fetch(TranslationTicket {
            ctx,
            language: key,
            request,
        }))
    }

    /// 应用翻译响应（第二阶段）
    pub fn finish(
        &mut self,
        ctx: RequestCtx,
        language: &str,
        result: Result<TranslateResponse, ApiError>,
    ) -> TranslationOutcome {
        if !self.generations.is_current(ctx.generation) {
            debug!("{} 翻译响应已过期，丢弃", ctx);
            return TranslationOutcome::Stale;
        }
        self.pending.remove(language);

        match result {
            Ok(response) => {
                if let Some(cache) = self.cache.as_mut() {
                    cache.insert_once(language, response.translated_text);
                }
                self.active = LanguageTab::Translated(language.to_string());
                info!("{} ✓ {} 翻译完成", ctx, language);
                TranslationOutcome::Ready(language.to_string())
            }
            Err(error) => {
                warn!("{} ⚠️ {} 翻译失败: {}", ctx, language, error);
                self.active = LanguageTab::Original;
                let message = if error.is_rejected() {
                    format!("Translation failed: {}", error)
                } else {
                    format!("Translation request failed: {}", error)
                };
                TranslationOutcome::Failed {
                    language: language.to_string(),
                    message,
                }
            }
        }
    }
}

impl Default for TranslationSwitcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> TranslationSwitcher {
        let mut switcher = TranslationSwitcher::new();
        switcher.load(Arc::new(Report::new("raw", "Your results are normal.")));
        switcher
    }

    fn fetch(selection: Selection) -> TranslationTicket {
        match selection {
            Selection::Fetch(ticket) => ticket,
            Selection::Done(outcome) => panic!("expected fetch, got {:?}", outcome),
        }
    }

    fn translated(text: &str) -> Result<TranslateResponse, ApiError> {
        Ok(TranslateResponse {
            translated_text: text.to_string(),
        })
    }

    #[test]
    fn language_names_are_canonicalized() {
        assert_eq!(canonical_language(" chinese "), "Chinese");
        assert_eq!(LanguageTab::parse("original"), LanguageTab::Original);
        assert_eq!(LanguageTab::parse("ENGLISH"), LanguageTab::Original);
        assert_eq!(
            LanguageTab::parse("spanish"),
            LanguageTab::Translated("Spanish".into())
        );
        assert_eq!(LanguageTab::parse("Chinese").to_string(), "中文");
        assert_eq!(language_label("Klingon"), "Klingon");
    }

    #[test]
    fn cache_always_has_original_and_is_write_once() {
        let mut cache = TranslationCache::new("original text");
        assert_eq!(cache.get("English"), Some("original text"));
        assert!(cache.insert_once("Chinese", "一".into()));
        assert!(!cache.insert_once("Chinese", "二".into()));
        assert!(!cache.insert_once("English", "changed".into()));
        assert_eq!(cache.get("Chinese"), Some("一"));
        assert_eq!(cache.get("English"), Some("original text"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn select_without_report_is_validation_error() {
        let mut switcher = TranslationSwitcher::new();
        assert_eq!(
            switcher.select("Chinese").unwrap_err(),
            ValidationError::NoExplanation
        );
    }

    #[test]
    fn blank_language_is_rejected_without_request() {
        let mut switcher = loaded();
        assert_eq!(
            switcher.select("   ").unwrap_err(),
            ValidationError::NoLanguage
        );
        assert!(!switcher.is_loading());
        assert_eq!(switcher.active(), &LanguageTab::Original);
    }

    #[test]
    fn absent_language_goes_pending_without_switching() {
        let mut switcher = loaded();
        let ticket = fetch(switcher.select("Chinese").unwrap());

        assert_eq!(ticket.request.text, "Your results are normal.");
        assert_eq!(ticket.request.language, "Chinese");
        assert_eq!(switcher.state("Chinese"), TranslationState::Pending);
        assert!(switcher.is_loading());
        assert_eq!(switcher.active(), &LanguageTab::Original);

        let outcome = switcher.finish(ticket.ctx, &ticket.language, translated("结果正常"));
        assert_eq!(outcome, TranslationOutcome::Ready("Chinese".into()));
        assert_eq!(switcher.state("Chinese"), TranslationState::Ready);
        assert_eq!(switcher.active_text(), Some("结果正常"));
        assert!(!switcher.is_loading());
    }

    #[test]
    fn ready_language_switches_synchronously() {
        let mut switcher = loaded();
        let ticket = fetch(switcher.select("Chinese").unwrap());
        switcher.finish(ticket.ctx, &ticket.language, translated("结果正常"));

        match switcher.select("original").unwrap() {
            Selection::Done(TranslationOutcome::Switched(LanguageTab::Original)) => {}
            other => panic!("unexpected: {:?}", other),
        }
        match switcher.select("Chinese").unwrap() {
            Selection::Done(TranslationOutcome::Switched(tab)) => {
                assert_eq!(tab, LanguageTab::Translated("Chinese".into()))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn reselecting_active_tab_is_noop() {
        let mut switcher = loaded();
        match switcher.select("English").unwrap() {
            Selection::Done(TranslationOutcome::Unchanged) => {}
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(switcher.active(), &LanguageTab::Original);
    }

    #[test]
    fn pending_language_is_not_requested_twice() {
        let mut switcher = loaded();
        let _ticket = fetch(switcher.select("Spanish").unwrap());
        match switcher.select("spanish").unwrap() {
            Selection::Done(TranslationOutcome::AlreadyPending(lang)) => assert_eq!(lang, "Spanish"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn every_request_uses_original_explanation() {
        let mut switcher = loaded();
        let chinese = fetch(switcher.select("Chinese").unwrap());
        switcher.finish(chinese.ctx, &chinese.language, translated("结果正常"));
        assert_eq!(switcher.active(), &LanguageTab::Translated("Chinese".into()));

        let spanish = fetch(switcher.select("Spanish").unwrap());
        assert_eq!(spanish.request.text, "Your results are normal.");
    }

    #[test]
    fn failure_reverts_to_original_and_allows_retry() {
        let mut switcher = loaded();
        let ticket = fetch(switcher.select("Chinese").unwrap());
        let outcome = switcher.finish(
            ticket.ctx,
            &ticket.language,
            Err(ApiError::Rejected {
                endpoint: "/translate".into(),
                message: "quota exceeded".into(),
            }),
        );

        assert_eq!(
            outcome,
            TranslationOutcome::Failed {
                language: "Chinese".into(),
                message: "Translation failed: quota exceeded".into(),
            }
        );
        assert_eq!(switcher.active(), &LanguageTab::Original);
        assert_eq!(switcher.state("Chinese"), TranslationState::Absent);
        assert!(matches!(
            switcher.select("Chinese").unwrap(),
            Selection::Fetch(_)
        ));
    }

    #[test]
    fn response_for_replaced_report_is_stale() {
        let mut switcher = loaded();
        let ticket = fetch(switcher.select("Chinese").unwrap());

        switcher.load(Arc::new(Report::new("raw2", "Second report.")));
        let outcome = switcher.finish(ticket.ctx, &ticket.language, translated("旧的"));

        assert_eq!(outcome, TranslationOutcome::Stale);
        assert_eq!(switcher.state("Chinese"), TranslationState::Absent);
        assert_eq!(switcher.active_text(), Some("Second report."));
    }
}
