// ==========================================
// Excel 导入列映射引擎 - 映射引擎
// ==========================================
// 职责: 自动建议映射 / 单射编辑 / 下拉选项 / 行投影 / 必填校验
// 红线: 纯函数、无状态；任何操作都不因数据缺失而报错
// ==========================================
// 输入: RawRow 序列 + FieldSpec 序列 + ColumnMapping
// 输出: 新的 ColumnMapping / ProjectedRow 序列 / 未满足必填字段
// ==========================================

use crate::domain::cell::CellValue;
use crate::domain::field::FieldSpec;
use crate::domain::mapping::ColumnMapping;
use crate::domain::row::{header_columns, ProjectedRow, RawRow};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// 列名/字段名归一化（去首尾空白 + 小写）
pub fn normalize_label(text: &str) -> String {
    text.trim().to_lowercase()
}

// ==========================================
// MappingEngine - 映射引擎
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingEngine;

impl MappingEngine {
    /// 创建新的映射引擎
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // 自动建议
    // ==========================================

    /// 根据表头自动建议映射
    ///
    /// 规则（按字段声明顺序逐个处理）:
    /// 1) 先找归一化后等于 label 的首列
    /// 2) label 未命中时，按别名声明顺序逐个找首列
    /// 3) 已被前序字段占用的列不再参与匹配
    /// 4) 无命中的字段不出现在结果中
    #[instrument(
        skip(self, raw_rows, fields),
        fields(rows = raw_rows.len(), field_count = fields.len())
    )]
    pub fn auto_suggest_mapping(
        &self,
        raw_rows: &[RawRow],
        fields: &[FieldSpec],
    ) -> ColumnMapping {
        let columns = header_columns(raw_rows);
        let normalized: Vec<String> = columns.iter().map(|c| normalize_label(c)).collect();

        let mut mapping = ColumnMapping::new();
        let mut claimed: HashSet<usize> = HashSet::new();

        for field in fields {
            let candidates = std::iter::once(&field.label).chain(field.alternate_labels.iter());

            let hit = candidates
                .map(|label| normalize_label(label))
                .find_map(|target| {
                    normalized
                        .iter()
                        .enumerate()
                        .find(|(idx, col)| !claimed.contains(idx) && **col == target)
                        .map(|(idx, _)| idx)
                });

            if let Some(idx) = hit {
                claimed.insert(idx);
                mapping.set(&field.key, &columns[idx]);
            }
        }

        debug!(matched = mapping.len(), "自动映射完成");
        mapping
    }

    // ==========================================
    // 编辑
    // ==========================================

    /// 编辑某列的字段归属（唯一的映射变更原语）
    ///
    /// 1) 先移除占用该列的映射（按单射约束至多一条）
    /// 2) new_field 非空时，将该字段指向该列（字段原先的列随之释放）
    pub fn apply_column_edit(
        &self,
        mapping: &ColumnMapping,
        column: &str,
        new_field: Option<&str>,
    ) -> ColumnMapping {
        let mut next = mapping.clone();
        next.release_column(column);

        if let Some(field_key) = new_field {
            next.set(field_key, column);
        }

        next
    }

    /// 某列下拉可选字段
    ///
    /// 未映射到其他列的字段全部可选；当前列已映射的字段保留在选项中
    pub fn available_field_options(
        &self,
        mapping: &ColumnMapping,
        all_fields: &[FieldSpec],
        column: &str,
    ) -> Vec<FieldSpec> {
        all_fields
            .iter()
            .filter(|field| match mapping.column_for(&field.key) {
                None => true,
                Some(mapped) => mapped == column,
            })
            .cloned()
            .collect()
    }

    // ==========================================
    // 投影
    // ==========================================

    /// 将原始行投影为目标行
    ///
    /// - id 为 1 起始的行序号
    /// - 已映射字段取对应列值；行内缺列时为 Null
    /// - 未映射字段不出现
    pub fn project(&self, raw_rows: &[RawRow], mapping: &ColumnMapping) -> Vec<ProjectedRow> {
        raw_rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut projected = ProjectedRow::new(idx + 1);
                for (field_key, column) in mapping.iter() {
                    let value = row.get(column).cloned().unwrap_or(CellValue::Null);
                    projected.fields.insert(field_key.to_string(), value);
                }
                projected
            })
            .collect()
    }

    // ==========================================
    // 校验
    // ==========================================

    /// 未满足的必填字段（按声明顺序）；为空即校验通过
    pub fn validate_required(
        &self,
        mapping: &ColumnMapping,
        fields: &[FieldSpec],
    ) -> Vec<FieldSpec> {
        fields
            .iter()
            .filter(|field| field.required && !mapping.contains_field(&field.key))
            .cloned()
            .collect()
    }
}
