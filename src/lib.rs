//! # Report Interpreter
//!
//! 医疗报告解读客户端：上传化验单图片、切换解读语言、围绕报告提问
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 接口层（Clients）
//! - `clients/` - 只负责和报告分析服务通信
//! - `ReportApi` - 五个接口的抽象，便于替换
//! - `ReportClient` - 基于 reqwest 的实现
//! - `ScriptedApi` - 内存实现，按脚本返回响应
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 每个协调器只拥有自己的状态
//! - `UploadCoordinator` - 上传并生成报告
//! - `TranslationSwitcher` - 翻译缓存与单选标签页
//! - `QaSession` - 问答记录与参考文献
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份报告"的完整交互流程
//! - `ReportSession` - 上传时重置下游，过期响应按代数丢弃
//!
//! ### ④ 展示层（View / App）
//! - `view/` - 只读状态，生成终端文本
//! - `App` - 读取命令行输入并分发
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod services;
pub mod utils;
pub mod view;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use clients::{ReportApi, ReportClient, ScriptedApi};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Indicator, Report, ReportFile};
pub use workflow::ReportSession;
