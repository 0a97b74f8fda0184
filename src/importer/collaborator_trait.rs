// ==========================================
// Excel 导入列映射引擎 - 外部协作方 Trait
// ==========================================
// 职责: 定义编排器依赖的异步边界（不包含实现）
// 边界: 工作簿解码 / 行格式化 / 提交处理
// ==========================================

use crate::domain::row::ProjectedRow;
use crate::domain::workbook::Workbook;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// WorkbookLoader Trait
// ==========================================
// 用途: 原始字节 → 工作簿（表名 + 行序列）
// 实现者: UniversalWorkbookLoader
#[async_trait]
pub trait WorkbookLoader: Send + Sync {
    /// 解码上传文件
    ///
    /// # 参数
    /// - file_name: 原始文件名（用于扩展名判断）
    /// - bytes: 文件内容
    ///
    /// # 返回
    /// - Ok(Workbook): 解码结果
    /// - Err: 格式不支持、文件损坏等（编排器据此清空行集）
    async fn decode(&self, file_name: &str, bytes: Vec<u8>) -> ImportResult<Workbook>;
}

// ==========================================
// RowFormatter Trait
// ==========================================
// 用途: 提交前逐行格式化（如字段清洗、补默认值）
// 实现者: PassThroughFormatter
#[async_trait]
pub trait RowFormatter: Send + Sync {
    async fn format(&self, row: ProjectedRow) -> anyhow::Result<ProjectedRow>;
}

// ==========================================
// SubmitOutcome - 提交结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// 处理方是否接受
    pub accepted: bool,

    /// 处理方返回的提示信息
    pub message: Option<String>,
}

impl SubmitOutcome {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: Some(message.into()),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: Some(message.into()),
        }
    }
}

// ==========================================
// SubmitHandler Trait
// ==========================================
// 用途: 接收最终投影行的外部 I/O 汇
// 实现者: JsonFileSubmitHandler / 调用方自定义
#[async_trait]
pub trait SubmitHandler: Send + Sync {
    /// 提交全部投影行
    ///
    /// # 返回
    /// - Ok(SubmitOutcome { accepted: true, .. }): 成功
    /// - Ok(SubmitOutcome { accepted: false, .. }): 处理方拒绝
    /// - Err: 处理方异常
    async fn submit(&self, rows: Vec<ProjectedRow>) -> anyhow::Result<SubmitOutcome>;
}
