// ==========================================
// Excel 导入列映射引擎 - 提交处理实现
// ==========================================
// PassThroughFormatter: 原样输出（默认行格式化器）
// JsonFileSubmitHandler: 将提交行写入 JSON 文件
// ==========================================

use crate::domain::row::ProjectedRow;
use crate::importer::collaborator_trait::{RowFormatter, SubmitHandler, SubmitOutcome};
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

// ==========================================
// PassThroughFormatter
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFormatter;

#[async_trait]
impl RowFormatter for PassThroughFormatter {
    async fn format(&self, row: ProjectedRow) -> anyhow::Result<ProjectedRow> {
        Ok(row)
    }
}

// ==========================================
// JsonFileSubmitHandler
// ==========================================
#[derive(Debug, Clone)]
pub struct JsonFileSubmitHandler {
    output_path: PathBuf,
}

impl JsonFileSubmitHandler {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }
}

#[async_trait]
impl SubmitHandler for JsonFileSubmitHandler {
    async fn submit(&self, rows: Vec<ProjectedRow>) -> anyhow::Result<SubmitOutcome> {
        let json = serde_json::to_string_pretty(&rows).context("序列化提交数据失败")?;

        tokio::fs::write(&self.output_path, json)
            .await
            .with_context(|| format!("写入文件失败: {}", self.output_path.display()))?;

        info!(
            rows = rows.len(),
            path = %self.output_path.display(),
            "提交数据已写入"
        );
        Ok(SubmitOutcome::accepted(format!("已导入 {} 条记录", rows.len())))
    }
}
