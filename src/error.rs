use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求发出前的校验错误
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// 报告分析 API 调用错误
    #[error(transparent)]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 校验错误
///
/// 在发出任何网络请求之前检测到，`Display` 即为展示给用户的提示文本。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 没有选择文件
    #[error("Please select a medical report image")]
    NoFileSelected,
    /// 文件超过上传大小限制
    #[error("File is too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },
    /// 问题为空
    #[error("Please enter a question")]
    EmptyQuestion,
    /// 尚未上传报告
    #[error("Please upload a medical report first")]
    NoReport,
    /// 没有可翻译的解释内容
    #[error("No explanation content to translate")]
    NoExplanation,
    /// 上一个问题尚未得到回答
    #[error("Please wait for the current answer before asking again")]
    QuestionPending,
    /// 语言名为空
    #[error("Please choose a language")]
    NoLanguage,
    /// 没有可导出的指标
    #[error("No indicators available for export")]
    NoIndicators,
}

/// API 调用错误
///
/// `Rejected` 对应服务端返回 `success: false` 的逻辑失败，
/// `Transport` 对应网络错误、状态码错误或响应无法解析。
#[derive(Debug, Error)]
pub enum ApiError {
    /// 服务端明确拒绝（`{ success: false, message }`）
    #[error("{message}")]
    Rejected { endpoint: String, message: String },
    /// 网络请求失败
    #[error("{source}")]
    Transport {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 非 2xx 状态码且响应体不是标准结构
    #[error("HTTP {status}: {body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// JSON 解析失败
    #[error("invalid response from {endpoint}: {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// 是否为逻辑失败（服务端返回了 `success: false`）
    pub fn is_rejected(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }

    /// 出错的接口路径
    pub fn endpoint(&self) -> &str {
        match self {
            ApiError::Rejected { endpoint, .. }
            | ApiError::Transport { endpoint, .. }
            | ApiError::BadStatus { endpoint, .. }
            | ApiError::JsonParseFailed { endpoint, .. } => endpoint,
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// API 地址不合法
    #[error("无效的 API 地址: {url}")]
    InvalidBaseUrl { url: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::Transport {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            AppError::File(FileError::NotFound { path })
        } else {
            AppError::File(FileError::ReadFailed { path, source })
        }
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::NoFileSelected.to_string(),
            "Please select a medical report image"
        );
        assert_eq!(
            ValidationError::EmptyQuestion.to_string(),
            "Please enter a question"
        );
        assert_eq!(
            ValidationError::NoLanguage.to_string(),
            "Please choose a language"
        );
        let app: AppError = ValidationError::NoReport.into();
        assert_eq!(app.to_string(), "Please upload a medical report first");
    }

    #[test]
    fn rejected_displays_server_message_only() {
        let err = ApiError::Rejected {
            endpoint: "/upload".into(),
            message: "unreadable image".into(),
        };
        assert!(err.is_rejected());
        assert_eq!(err.endpoint(), "/upload");
        assert_eq!(err.to_string(), "unreadable image");
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AppError::file_read_failed("scan.png", io);
        assert!(matches!(err, AppError::File(FileError::NotFound { .. })));
    }
}
