pub mod report_session;

pub use report_session::ReportSession;
