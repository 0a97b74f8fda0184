// ==========================================
// Excel 导入列映射引擎 - 核心库
// ==========================================
// 流程: 上传 → 选表 → 列映射 → 预览 → 提交
// 定位: 嵌入式库（展示层调用引擎并渲染其只读状态）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 字段/行/映射/会话
pub mod domain;

// 引擎层 - 映射引擎与导入编排
pub mod engine;

// 导入层 - 解码/提交协作方
pub mod importer;

// 配置层 - 字段声明与选项
pub mod config;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    BusyOperation, CellValue, ColumnMapping, FieldSchema, FieldSpec, ImportSession, ImportStep,
    ProjectedRow, RawRow, SessionSnapshot, Workbook,
};

pub use engine::{
    AdvanceOutcome, ImportOrchestrator, LoadOutcome, MappingEngine, PreviewPage, SubmitResult,
};

pub use importer::{
    ImportError, ImportResult, JsonFileSubmitHandler, RowFormatter, SubmitHandler, SubmitOutcome,
    UniversalWorkbookLoader, WorkbookLoader,
};

pub use config::ImportConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Excel 导入列映射引擎";
