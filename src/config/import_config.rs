// ==========================================
// Excel 导入列映射引擎 - 导入配置
// ==========================================
// 职责: 字段集合 + 解码选项 + 预览分页配置的加载与校验
// 存储: JSON 文件 / JSON 字符串
// ==========================================

use crate::domain::field::{FieldSchema, FieldSpec};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::workbook_loader::LoaderOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// ==========================================
// 配置默认值
// ==========================================
pub mod defaults {
    /// 预览每页行数
    pub const PREVIEW_PAGE_SIZE: usize = 5;

    /// 文本单元格去首尾空白
    pub const TRIM_TEXT: bool = true;

    /// 跳过空白行
    pub const SKIP_BLANK_ROWS: bool = true;

    pub(super) fn preview_page_size() -> usize {
        PREVIEW_PAGE_SIZE
    }

    pub(super) fn trim_text() -> bool {
        TRIM_TEXT
    }

    pub(super) fn skip_blank_rows() -> bool {
        SKIP_BLANK_ROWS
    }
}

// ==========================================
// ImportConfig - 导入配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// 内置字段
    pub fields: Vec<FieldSpec>,

    /// 自定义字段（追加在内置字段之后）
    #[serde(default, alias = "customFields")]
    pub custom_fields: Vec<FieldSpec>,

    #[serde(default = "defaults::preview_page_size", alias = "previewPageSize")]
    pub preview_page_size: usize,

    #[serde(default = "defaults::trim_text", alias = "trimText")]
    pub trim_text: bool,

    #[serde(default = "defaults::skip_blank_rows", alias = "skipBlankRows")]
    pub skip_blank_rows: bool,
}

impl ImportConfig {
    /// 以字段列表创建配置（其余取默认值）
    pub fn with_fields(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            custom_fields: Vec::new(),
            preview_page_size: defaults::PREVIEW_PAGE_SIZE,
            trim_text: defaults::TRIM_TEXT,
            skip_blank_rows: defaults::SKIP_BLANK_ROWS,
        }
    }

    /// 从 JSON 字符串加载
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        let config: ImportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ImportError::ConfigReadError {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: ImportConfig =
            serde_json::from_str(&content).map_err(|e| ImportError::ConfigReadError {
                source_name: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;

        debug!(
            path = %path.display(),
            fields = config.fields.len(),
            custom_fields = config.custom_fields.len(),
            "导入配置加载完成"
        );
        Ok(config)
    }

    /// 校验配置值（字段唯一性在 schema() 中校验）
    pub fn validate(&self) -> ImportResult<()> {
        if self.preview_page_size == 0 {
            return Err(ImportError::ConfigValueError {
                key: "preview_page_size".to_string(),
                value: self.preview_page_size.to_string(),
                message: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 构建字段集合（内置 + 自定义）
    pub fn schema(&self) -> ImportResult<FieldSchema> {
        FieldSchema::from_parts(self.fields.clone(), self.custom_fields.clone())
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            trim_text: self.trim_text,
            skip_blank_rows: self.skip_blank_rows,
        }
    }
}
