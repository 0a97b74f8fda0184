// ==========================================
// Excel 导入列映射引擎 - 领域类型定义
// ==========================================
// 向导步骤 / 在途操作
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 向导步骤 (Import Step)
// ==========================================
// Upload: 上传 + 选表 + 列映射
// Preview: 预览 + 提交
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStep {
    #[default]
    Upload,
    Preview,
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStep::Upload => write!(f, "UPLOAD"),
            ImportStep::Preview => write!(f, "PREVIEW"),
        }
    }
}

// ==========================================
// 在途操作 (Busy Operation)
// ==========================================
// 同一时刻最多一个异步 I/O 在途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusyOperation {
    LoadingFile,
    Submitting,
}

impl fmt::Display for BusyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusyOperation::LoadingFile => write!(f, "LOADING_FILE"),
            BusyOperation::Submitting => write!(f, "SUBMITTING"),
        }
    }
}
