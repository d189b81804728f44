pub mod filters;
pub mod logging;

pub use filters::{check_null, convert_date};
pub use logging::truncate_text;
