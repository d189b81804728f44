use anyhow::{Context, Result};
use phf::phf_map;
use std::path::Path;
use tokio::fs;

/// 扩展名 → MIME 类型
static MIME_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "png" => "image/png",
    "gif" => "image/gif",
    "bmp" => "image/bmp",
    "webp" => "image/webp",
    "tif" => "image/tiff",
    "tiff" => "image/tiff",
};

/// 待上传的报告图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ReportFile {
    /// 由内存数据构建，MIME 类型按文件名推断
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// 文件大小（字节）
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// 按扩展名推断 MIME 类型，未知类型按二进制流上传
pub fn mime_for(file_name: &str) -> &'static str {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| MIME_TYPES.get(ext.to_ascii_lowercase().as_str()).copied())
        .unwrap_or("application/octet-stream")
}

/// 从磁盘读取报告图片
pub async fn load_report_file(path: &Path) -> Result<ReportFile> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("无法读取报告文件: {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("无效的文件路径: {}", path.display()))?;

    tracing::debug!("已读取 {} ({} 字节)", file_name, bytes.len());

    Ok(ReportFile::new(file_name, bytes))
}
