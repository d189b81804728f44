//! 客户端层
//!
//! `ReportApi` 是协调器与远端报告分析服务之间唯一的接缝：
//! 协调器只依赖这个 trait，不关心请求走的是 HTTP 还是内存脚本。

pub mod report_client;
pub mod scripted;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ApiError;
use crate::models::{
    AskResponse, Indicator, QuestionRequest, RagResponse, ReportFile, TranslateRequest,
    TranslateResponse, UploadResponse,
};

pub use report_client::{decode_envelope, ReportClient};
pub use scripted::{ApiCall, ScriptedApi};

/// 报告分析服务的接口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Upload,
    Translate,
    Ask,
    RagEnhance,
    ExportIndicators,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Upload => "/upload",
            Endpoint::Translate => "/translate",
            Endpoint::Ask => "/ask",
            Endpoint::RagEnhance => "/rag-enhance",
            Endpoint::ExportIndicators => "/export-indicators",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// 报告分析服务
///
/// 每个方法对应一个接口，`success: false` 统一转换为 [`ApiError::Rejected`]。
#[async_trait]
pub trait ReportApi: Send + Sync {
    /// 上传报告图片（multipart，字段名 `file`）
    async fn upload(&self, file: &ReportFile) -> Result<UploadResponse, ApiError>;

    /// 翻译解读内容
    async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse, ApiError>;

    /// 直接问答
    async fn ask(&self, request: &QuestionRequest) -> Result<AskResponse, ApiError>;

    /// RAG 增强问答
    async fn rag_enhance(&self, request: &QuestionRequest) -> Result<RagResponse, ApiError>;

    /// 导出指标为 CSV 文本
    async fn export_indicators(
        &self,
        indicators: &BTreeMap<String, Indicator>,
    ) -> Result<String, ApiError>;
}
