pub mod file_loader;

pub use file_loader::{load_report_file, ReportFile};
