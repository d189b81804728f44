/// 报告分析 API 客户端
///
/// 封装所有与报告分析服务相关的 HTTP 调用
use crate::clients::{Endpoint, ReportApi};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{
    AskResponse, ExportRequest, Indicator, QuestionRequest, RagResponse, ReportFile,
    TranslateRequest, TranslateResponse, UploadResponse,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// 非 2xx 响应体在错误信息中保留的最大长度
const ERROR_BODY_PREVIEW: usize = 200;

/// 报告分析客户端（内部连接池共享，克隆开销很小）
#[derive(Clone)]
pub struct ReportClient {
    http: Client,
    base_url: String,
}

impl ReportClient {
    /// 创建新的报告分析客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::api_request_failed("client", e))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// 发送 JSON 请求并解析标准响应结构
    async fn post_json<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", self.url(endpoint));

        let response = self
            .http
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let (status, body) = read_body(endpoint, response).await?;
        decode_envelope(endpoint, status, &body)
    }
}

#[async_trait]
impl ReportApi for ReportClient {
    async fn upload(&self, file: &ReportFile) -> Result<UploadResponse, ApiError> {
        let endpoint = Endpoint::Upload;
        debug!(
            "上传报告: {} ({} 字节, {})",
            file.file_name,
            file.size(),
            file.mime_type
        );

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| transport_error(endpoint, e))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let (status, body) = read_body(endpoint, response).await?;
        decode_envelope(endpoint, status, &body)
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse, ApiError> {
        self.post_json(Endpoint::Translate, request).await
    }

    async fn ask(&self, request: &QuestionRequest) -> Result<AskResponse, ApiError> {
        self.post_json(Endpoint::Ask, request).await
    }

    async fn rag_enhance(&self, request: &QuestionRequest) -> Result<RagResponse, ApiError> {
        self.post_json(Endpoint::RagEnhance, request).await
    }

    async fn export_indicators(
        &self,
        indicators: &BTreeMap<String, Indicator>,
    ) -> Result<String, ApiError> {
        let endpoint = Endpoint::ExportIndicators;
        let request = ExportRequest {
            indicators: indicators.clone(),
        };

        let response = self
            .http
            .post(self.url(endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let (status, body) = read_body(endpoint, response).await?;
        decode_csv(endpoint, status, body)
    }
}

// ========== 响应解析 ==========

async fn read_body(endpoint: Endpoint, response: Response) -> Result<(u16, String), ApiError> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(endpoint, e))?;
    debug!("{} 返回 HTTP {} ({} 字节)", endpoint, status, body.len());
    Ok((status, body))
}

fn transport_error(endpoint: Endpoint, source: reqwest::Error) -> ApiError {
    warn!("请求 {} 失败: {}", endpoint, source);
    ApiError::Transport {
        endpoint: endpoint.path().to_string(),
        source: Box::new(source),
    }
}

fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// 解析标准响应结构 `{ success, message?, ...data }`
///
/// - `success: false`（任意状态码）→ [`ApiError::Rejected`]
/// - 非 2xx 且响应体不是标准结构 → [`ApiError::BadStatus`]
/// - 2xx 但响应体无法解析 → [`ApiError::JsonParseFailed`]
pub fn decode_envelope<T: DeserializeOwned>(
    endpoint: Endpoint,
    status: u16,
    body: &str,
) -> Result<T, ApiError> {
    let path = endpoint.path().to_string();

    let value: JsonValue = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(source) if is_success_status(status) => {
            return Err(ApiError::JsonParseFailed {
                endpoint: path,
                source,
            })
        }
        Err(_) => return Err(bad_status(path, status, body)),
    };

    match value.get("success").and_then(JsonValue::as_bool) {
        Some(false) => {
            let message = value
                .get("message")
                .and_then(JsonValue::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            warn!("{} 返回失败: {}", endpoint, message);
            Err(ApiError::Rejected {
                endpoint: path,
                message,
            })
        }
        _ if !is_success_status(status) => Err(bad_status(path, status, body)),
        Some(true) => serde_json::from_value(value).map_err(|source| ApiError::JsonParseFailed {
            endpoint: path,
            source,
        }),
        None => Err(ApiError::JsonParseFailed {
            endpoint: path,
            source: serde::de::Error::missing_field("success"),
        }),
    }
}

/// 解析 CSV 导出响应：成功时响应体即 CSV 文本，失败时为标准 JSON 结构
fn decode_csv(endpoint: Endpoint, status: u16, body: String) -> Result<String, ApiError> {
    if is_success_status(status) {
        let rejected = serde_json::from_str::<JsonValue>(&body)
            .ok()
            .filter(|v| v.get("success").and_then(JsonValue::as_bool) == Some(false));
        if rejected.is_none() {
            return Ok(body);
        }
    }
    decode_envelope::<JsonValue>(endpoint, status, &body).map(|_| body)
}

fn bad_status(endpoint: String, status: u16, body: &str) -> ApiError {
    let preview = crate::utils::truncate_text(body.trim(), ERROR_BODY_PREVIEW);
    ApiError::BadStatus {
        endpoint,
        status,
        body: preview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_decodes_data_fields() {
        let resp: AskResponse = decode_envelope(
            Endpoint::Ask,
            200,
            r#"{"success": true, "question": "q", "answer": "Looks fine."}"#,
        )
        .unwrap();
        assert_eq!(resp.answer, "Looks fine.");
    }

    #[test]
    fn failure_envelope_on_error_status_is_rejected() {
        let err = decode_envelope::<UploadResponse>(
            Endpoint::Upload,
            500,
            r#"{"success": false, "message": "Processing failed: unreadable image"}"#,
        )
        .unwrap_err();
        assert!(err.is_rejected());
        assert_eq!(err.to_string(), "Processing failed: unreadable image");
    }

    #[test]
    fn unparsable_error_status_is_transport() {
        let err = decode_envelope::<AskResponse>(Endpoint::Ask, 502, "<html>Bad Gateway</html>")
            .unwrap_err();
        assert!(matches!(err, ApiError::BadStatus { status: 502, .. }));
        assert!(!err.is_rejected());
    }

    #[test]
    fn error_status_without_envelope_is_transport() {
        let err = decode_envelope::<AskResponse>(
            Endpoint::Ask,
            422,
            r#"{"detail": [{"msg": "field required"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::BadStatus { status: 422, .. }));
    }

    #[test]
    fn missing_data_field_is_parse_failure() {
        let err = decode_envelope::<TranslateResponse>(
            Endpoint::Translate,
            200,
            r#"{"success": true}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::JsonParseFailed { .. }));
    }

    #[test]
    fn missing_success_flag_is_parse_failure() {
        let err = decode_envelope::<AskResponse>(Endpoint::Ask, 200, r#"{"answer": "x"}"#)
            .unwrap_err();
        assert!(matches!(err, ApiError::JsonParseFailed { .. }));
    }

    #[test]
    fn csv_body_passes_through() {
        let csv = "Indicator,Value\r\nGlucose,\"[95, 70, 100]\"\r\n".to_string();
        assert_eq!(
            decode_csv(Endpoint::ExportIndicators, 200, csv.clone()).unwrap(),
            csv
        );

        let err = decode_csv(
            Endpoint::ExportIndicators,
            400,
            r#"{"success": false, "message": "No indicators provided for export"}"#.to_string(),
        )
        .unwrap_err();
        assert!(err.is_rejected());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = Config {
            api_base_url: "http://localhost:8000/api/".to_string(),
            ..Config::default()
        };
        let client = ReportClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url(Endpoint::Upload), "http://localhost:8000/api/upload");
    }
}
