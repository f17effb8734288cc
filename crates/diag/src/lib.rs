pub mod report;
mod snippet;
pub mod source;
mod style;
mod util;
mod log;

pub use log::{Diagnostic, ErrorLog, Severity};
pub use report::Report;
pub use source::Source;
