// ==========================================
// Excel 导入列映射引擎 - 配置层
// ==========================================
// 职责: 字段声明与解码/预览选项
// 存储: JSON
// ==========================================

pub mod import_config;

// 重导出核心配置
pub use import_config::{defaults, ImportConfig};
