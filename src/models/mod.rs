pub mod loaders;
pub mod report;
pub mod request_ctx;
pub mod wire;

pub use loaders::{load_report_file, ReportFile};
pub use report::{Indicator, Report};
pub use request_ctx::{Generation, GenerationCounter, RequestCtx, RequestKind};
pub use wire::{
    AskResponse, ExportRequest, QuestionRequest, RagResponse, Reference, TranslateRequest,
    TranslateResponse, UploadResponse,
};
