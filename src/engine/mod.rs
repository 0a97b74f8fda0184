// ==========================================
// Excel 导入列映射引擎 - 引擎层
// ==========================================
// 职责: 列映射算法 + 导入流程编排 + 预览分页
// 红线: 映射引擎无状态；会话状态只由编排器持有
// ==========================================

pub mod import_orchestrator;
pub mod mapping_engine;
pub mod preview;

// 重导出核心引擎
pub use import_orchestrator::{AdvanceOutcome, ImportOrchestrator, LoadOutcome, SubmitResult};
pub use mapping_engine::{normalize_label, MappingEngine};
pub use preview::{paginate, PreviewPage, PreviewRow};
