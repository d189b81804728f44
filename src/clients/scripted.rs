//! 内存脚本实现，用于开发和测试
//!
//! 按接口预先排队响应，记录每一次调用，便于断言"发了几次请求、发了什么"。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use crate::clients::{decode_envelope, Endpoint, ReportApi};
use crate::error::ApiError;
use crate::models::{
    AskResponse, Indicator, QuestionRequest, RagResponse, ReportFile, TranslateRequest,
    TranslateResponse, UploadResponse,
};

/// 预设的响应
#[derive(Debug, Clone)]
enum Scripted {
    /// 响应体（HTTP 200），走与真实客户端相同的解析逻辑
    Body(JsonValue),
    /// 纯文本响应体（CSV 导出）
    Text(String),
    /// 网络层失败
    Transport(String),
}

/// 一次被记录的调用
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub endpoint: Endpoint,
    pub payload: JsonValue,
}

/// 按脚本返回响应的 `ReportApi`
#[derive(Default)]
pub struct ScriptedApi {
    responses: Mutex<HashMap<Endpoint, VecDeque<Scripted>>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为接口排队一个 JSON 响应体
    pub fn push_json(&self, endpoint: Endpoint, body: JsonValue) -> &Self {
        self.push(endpoint, Scripted::Body(body))
    }

    /// 为接口排队一个 `{ success: false, message }` 响应
    pub fn push_rejection(&self, endpoint: Endpoint, message: &str) -> &Self {
        self.push_json(endpoint, json!({ "success": false, "message": message }))
    }

    /// 为接口排队一个纯文本响应体
    pub fn push_text(&self, endpoint: Endpoint, body: impl Into<String>) -> &Self {
        self.push(endpoint, Scripted::Text(body.into()))
    }

    /// 为接口排队一个网络错误
    pub fn push_transport_error(&self, endpoint: Endpoint, message: &str) -> &Self {
        self.push(endpoint, Scripted::Transport(message.to_string()))
    }

    /// 所有调用记录（按发生顺序）
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 某个接口被调用的次数
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// 某个接口最近一次调用的请求体
    pub fn last_payload(&self, endpoint: Endpoint) -> Option<JsonValue> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| c.endpoint == endpoint)
            .map(|c| c.payload)
    }

    fn push(&self, endpoint: Endpoint, response: Scripted) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(endpoint)
            .or_default()
            .push_back(response);
        self
    }

    fn record(&self, endpoint: Endpoint, payload: JsonValue) -> Option<Scripted> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ApiCall { endpoint, payload });
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
    }

    fn respond<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        payload: JsonValue,
    ) -> Result<T, ApiError> {
        match self.record(endpoint, payload) {
            Some(Scripted::Body(body)) => decode_envelope(endpoint, 200, &body.to_string()),
            Some(Scripted::Text(text)) => decode_envelope(endpoint, 200, &text),
            Some(Scripted::Transport(message)) => Err(transport(endpoint, message)),
            None => Err(transport(endpoint, format!("no scripted response for {}", endpoint))),
        }
    }
}

fn transport(endpoint: Endpoint, message: String) -> ApiError {
    ApiError::Transport {
        endpoint: endpoint.path().to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            message,
        )),
    }
}

#[async_trait]
impl ReportApi for ScriptedApi {
    async fn upload(&self, file: &ReportFile) -> Result<UploadResponse, ApiError> {
        self.respond(
            Endpoint::Upload,
            json!({
                "file_name": file.file_name,
                "mime_type": file.mime_type,
                "size": file.size(),
            }),
        )
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse, ApiError> {
        self.respond(Endpoint::Translate, json!(request))
    }

    async fn ask(&self, request: &QuestionRequest) -> Result<AskResponse, ApiError> {
        self.respond(Endpoint::Ask, json!(request))
    }

    async fn rag_enhance(&self, request: &QuestionRequest) -> Result<RagResponse, ApiError> {
        self.respond(Endpoint::RagEnhance, json!(request))
    }

    async fn export_indicators(
        &self,
        indicators: &BTreeMap<String, Indicator>,
    ) -> Result<String, ApiError> {
        let endpoint = Endpoint::ExportIndicators;
        match self.record(endpoint, json!({ "indicators": indicators })) {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Body(body)) => {
                decode_envelope::<JsonValue>(endpoint, 200, &body.to_string())
                    .map(|v| v.to_string())
            }
            Some(Scripted::Transport(message)) => Err(transport(endpoint, message)),
            None => Err(transport(endpoint, format!("no scripted response for {}", endpoint))),
        }
    }
}
