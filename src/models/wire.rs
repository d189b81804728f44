//! 报告分析 API 的请求/响应结构
//!
//! 所有响应外层都有 `success` 字段，`success: false` 时只带 `message`，
//! 外层结构由客户端统一处理，这里只描述成功时的数据字段。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

use super::report::Indicator;

/// `POST /translate` 请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslateRequest {
    pub text: String,
    pub language: String,
}

/// `POST /ask` 与 `POST /rag-enhance` 共用的请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionRequest {
    pub report_content: String,
    pub question: String,
}

/// `POST /export-indicators` 请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub indicators: BTreeMap<String, Indicator>,
}

/// `POST /upload` 成功响应
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub original_content: String,
    pub explanation: String,
    #[serde(default)]
    pub indicators: Option<Map<String, JsonValue>>,
    #[serde(default)]
    pub report_date: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// `POST /translate` 成功响应
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
}

/// `POST /ask` 成功响应
#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// RAG 检索到的参考文献
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub content: String,
}

/// `POST /rag-enhance` 成功响应
#[derive(Debug, Clone, Deserialize)]
pub struct RagResponse {
    pub enhanced_explanation: String,
    #[serde(default)]
    pub references: Option<Vec<Reference>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_request_uses_snake_case_keys() {
        let req = QuestionRequest {
            report_content: "Hb 13.5".into(),
            question: "Is this anemia?".into(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "report_content": "Hb 13.5", "question": "Is this anemia?" })
        );
    }

    #[test]
    fn rag_response_keeps_reference_order() {
        let resp: RagResponse = serde_json::from_value(json!({
            "success": true,
            "enhanced_explanation": "combined",
            "references": [
                { "title": "B", "content": "second source" },
                { "title": "A", "content": "first source" }
            ]
        }))
        .unwrap();
        let refs = resp.references.unwrap();
        assert_eq!(refs[0].title, "B");
        assert_eq!(refs[1].content, "first source");
    }
}
