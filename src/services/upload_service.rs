//! 上传协调器 - 业务能力层
//!
//! 只负责"上传报告并得到解读"能力，下游状态的重置由会话层编排

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ValidationError};
use crate::models::{
    GenerationCounter, Report, ReportFile, RequestCtx, RequestKind, UploadResponse,
};

/// 一次已校验、待发送的上传
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub ctx: RequestCtx,
    pub file: ReportFile,
}

/// 上传失败
#[derive(Debug)]
pub struct UploadFailure {
    pub error: ApiError,
}

impl UploadFailure {
    /// 展示给用户的提示
    pub fn user_message(&self) -> String {
        if self.error.is_rejected() {
            format!("Processing failed: {}", self.error)
        } else {
            format!("Request failed: {}", self.error)
        }
    }
}

/// 上传结果
#[derive(Debug)]
pub enum UploadOutcome {
    /// 报告已生成
    Loaded(Arc<Report>),
    /// 服务端拒绝或网络失败，报告保持不变
    Failed(UploadFailure),
    /// 响应属于已被取代的上传，已丢弃
    Stale,
}

/// 上传协调器
///
/// 职责：
/// - 校验待上传文件
/// - 管理上传中 / 空闲状态与结果视图的显示
/// - 唯一写入 `Report` 的地方，成功时整体替换
pub struct UploadCoordinator {
    report: Option<Arc<Report>>,
    busy: bool,
    results_visible: bool,
    generations: GenerationCounter,
    max_upload_bytes: u64,
    loaded_count: usize,
}

impl UploadCoordinator {
    /// 创建新的上传协调器
    pub fn new(max_upload_bytes: u64) -> Self {
        Self {
            report: None,
            busy: false,
            results_visible: false,
            generations: GenerationCounter::default(),
            max_upload_bytes,
            loaded_count: 0,
        }
    }

    /// 当前报告
    pub fn report(&self) -> Option<&Arc<Report>> {
        self.report.as_ref()
    }

    /// 是否正在上传（上传按钮禁用、显示加载中）
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// 结果视图是否可见
    pub fn results_visible(&self) -> bool {
        self.results_visible
    }

    /// 本次会话成功加载的报告数
    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    /// 开始上传
    ///
    /// 校验失败时不改变任何状态；通过后立即进入上传中并隐藏结果视图，
    /// 之前发出但尚未返回的上传全部作废。
    pub fn begin(&mut self, file: Option<ReportFile>) -> Result<UploadTicket, ValidationError> {
        let file = file.ok_or(ValidationError::NoFileSelected)?;
        if file.size() > self.max_upload_bytes {
            return Err(ValidationError::FileTooLarge {
                size: file.size(),
                limit: self.max_upload_bytes,
            });
        }

        self.busy = true;
        self.results_visible = false;
        let ctx = RequestCtx::new(RequestKind::Upload, self.generations.advance());

        info!("{} 📤 正在上传报告: {}", ctx, file.file_name);
        Ok(UploadTicket { ctx, file })
    }

    /// 应用上传响应
    pub fn finish(
        &mut self,
        ctx: RequestCtx,
        result: Result<UploadResponse, ApiError>,
    ) -> UploadOutcome {
        if !self.generations.is_current(ctx.generation) {
            debug!("{} 响应已过期，丢弃", ctx);
            return UploadOutcome::Stale;
        }

        self.busy = false;

        match result {
            Ok(response) => {
                let report = Arc::new(Report::from_upload(response));
                self.report = Some(report.clone());
                self.results_visible = true;
                self.loaded_count += 1;
                info!(
                    "{} ✓ 报告解析成功，指标 {} 项",
                    ctx,
                    report.indicators().len()
                );
                UploadOutcome::Loaded(report)
            }
            Err(error) => {
                warn!("{} ❌ 上传失败: {}", ctx, error);
                UploadOutcome::Failed(UploadFailure { error })
            }
        }
    }
}
