// ==========================================
// Excel 导入列映射引擎 - 导入会话
// ==========================================
// 聚合根: 工作簿 / 当前表 / 原始行 / 映射 / 投影 / 手动编辑标记 / 步骤
// 红线: 会话由编排器独占，外部只读快照
// ==========================================

use crate::domain::field::FieldSpec;
use crate::domain::mapping::ColumnMapping;
use crate::domain::row::{header_columns, ProjectedRow, RawRow};
use crate::domain::types::{BusyOperation, ImportStep};
use crate::domain::workbook::Workbook;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// ==========================================
// ImportSession - 导入会话
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub step: ImportStep,

    // 文件与工作簿
    pub file_name: Option<String>,
    pub workbook: Option<Workbook>,
    pub sheet_names: Vec<String>,
    pub current_sheet: Option<String>,

    // 行与映射
    pub raw_rows: Vec<RawRow>,
    pub mapping: ColumnMapping,
    pub projection: Vec<ProjectedRow>,

    /// 进入 Preview 时的投影快照
    pub preview: Vec<ProjectedRow>,

    /// 用户已手动编辑映射（此后不再自动建议）
    pub manually_edited: bool,

    /// 最近一次非致命错误（解码失败/提交失败）
    pub last_error: Option<String>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            step: ImportStep::Upload,
            file_name: None,
            workbook: None,
            sheet_names: Vec::new(),
            current_sheet: None,
            raw_rows: Vec::new(),
            mapping: ColumnMapping::new(),
            projection: Vec::new(),
            preview: Vec::new(),
            manually_edited: false,
            last_error: None,
        }
    }

    /// 完全重置（取消/重新上传/提交成功）
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 清空映射与投影（切换工作表时），保留文件/工作簿/表名
    pub fn clear_mapping(&mut self) {
        self.mapping = ColumnMapping::new();
        self.projection.clear();
        self.preview.clear();
        self.manually_edited = false;
    }

    /// 当前表的列名（表头顺序）
    pub fn columns(&self) -> Vec<String> {
        header_columns(&self.raw_rows)
    }

    pub fn has_file(&self) -> bool {
        self.file_name.is_some()
    }
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// SessionSnapshot - 会话只读视图
// ==========================================
// 每次操作后由编排器派生，供展示层渲染
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub step: ImportStep,
    pub file_name: Option<String>,
    pub sheet_names: Vec<String>,
    pub current_sheet: Option<String>,
    pub columns: Vec<String>,
    pub mapping: ColumnMapping,
    pub projection: Vec<ProjectedRow>,
    pub unsatisfied_required: Vec<FieldSpec>,
    pub busy: Option<BusyOperation>,
    pub last_error: Option<String>,
    pub manually_edited: bool,
}

impl SessionSnapshot {
    pub fn row_count(&self) -> usize {
        self.projection.len()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn can_advance(&self) -> bool {
        self.step == ImportStep::Upload
            && self.file_name.is_some()
            && self.unsatisfied_required.is_empty()
    }
}
