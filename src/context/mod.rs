//! Context discovery, relevance scoring and budgeted selection

mod chunk;
mod discovery;
mod dynamic;
mod report;
mod selector;

pub use chunk::ContextChunk;
pub use discovery::{discover_context_files, extract_title};
pub use dynamic::DynamicContext;
pub use report::{format_report, ReportOptions};
pub use selector::{score_relevance, ContextSelector, Selection, SelectionStats};
