// ==========================================
// Excel 导入列映射引擎 - 导入层
// ==========================================
// 职责: 外部协作方（解码/格式化/提交）的接口与实现
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod collaborator_trait;
pub mod error;
pub mod submit_handler;
pub mod workbook_loader;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use submit_handler::{JsonFileSubmitHandler, PassThroughFormatter};
pub use workbook_loader::{
    decode_bytes, dedupe_headers, LoaderOptions, SpreadsheetFormat, UniversalWorkbookLoader,
    CSV_SHEET_NAME, EMPTY_HEADER,
};

// 重导出 Trait 接口
pub use collaborator_trait::{RowFormatter, SubmitHandler, SubmitOutcome, WorkbookLoader};
