use serde::Deserialize;
use std::path::Path;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::services::canonical_language;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 报告分析服务地址
    pub api_base_url: String,
    /// 单次请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: u64,
    /// 可选的翻译语言，第一个为原文语言
    pub translation_languages: Vec<String>,
    /// 问答是否默认启用 RAG
    pub rag_enabled: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 会话日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 120,
            max_upload_bytes: 10 * 1024 * 1024,
            translation_languages: vec![
                "English".to_string(),
                "Chinese".to_string(),
                "Spanish".to_string(),
            ],
            rag_enabled: false,
            verbose_logging: false,
            output_log_file: "session_log.txt".to_string(),
        }
    }
}

/// TOML 配置文件中的可选项
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    max_upload_bytes: Option<u64>,
    translation_languages: Option<Vec<String>>,
    rag_enabled: Option<bool>,
    verbose_logging: Option<bool>,
    output_log_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().overlay_env()
    }

    /// 加载配置：默认值 → TOML 文件（`REPORT_CONFIG_FILE`）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("REPORT_CONFIG_FILE") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        let config = base.overlay_env();
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: FileConfig = toml::from_str(content)?;
        let default = Self::default();
        Ok(Self {
            api_base_url: file.api_base_url.unwrap_or(default.api_base_url),
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(default.request_timeout_secs),
            max_upload_bytes: file.max_upload_bytes.unwrap_or(default.max_upload_bytes),
            translation_languages: file
                .translation_languages
                .map(|list| normalize_languages(list.iter().map(String::as_str)))
                .filter(|list| !list.is_empty())
                .unwrap_or(default.translation_languages),
            rag_enabled: file.rag_enabled.unwrap_or(default.rag_enabled),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
            output_log_file: file.output_log_file.unwrap_or(default.output_log_file),
        })
    }

    fn overlay_env(self) -> Self {
        Self {
            api_base_url: std::env::var("REPORT_API_BASE_URL").unwrap_or(self.api_base_url),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.request_timeout_secs),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(self.max_upload_bytes),
            translation_languages: std::env::var("TRANSLATION_LANGUAGES").ok().map(|v| parse_language_list(&v)).filter(|l| !l.is_empty()).unwrap_or(self.translation_languages),
            rag_enabled: std::env::var("RAG_ENABLED").ok().and_then(|v| v.parse().ok()).unwrap_or(self.rag_enabled),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.api_base_url.clone(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "REQUEST_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                expected_type: "正整数".to_string(),
            });
        }
        Ok(())
    }
}

/// 解析逗号分隔的语言列表
fn parse_language_list(raw: &str) -> Vec<String> {
    normalize_languages(raw.split(','))
}

/// 规范化语言名，去掉空项和重复项（保留首次出现的顺序）
fn normalize_languages<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for language in names.map(canonical_language).filter(|l| !l.is_empty()) {
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    languages
}
