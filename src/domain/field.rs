// ==========================================
// Excel 导入列映射引擎 - 字段定义
// ==========================================
// 职责: 调用方声明的目标字段（key/label/别名/必填）
// 红线: key 在内置字段 + 自定义字段合并后唯一，构造期校验
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 投影行的行号键，字段 key 不可使用
pub const ROW_ID_KEY: &str = "id";

// ==========================================
// FieldSpec - 目标字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// 稳定标识（投影行中的键）
    #[serde(alias = "id")]
    pub key: String,

    /// 显示名称（自动匹配的首选文本）
    pub label: String,

    /// 自动匹配时额外识别的列名，按声明顺序尝试
    #[serde(default, alias = "alternateLabels")]
    pub alternate_labels: Vec<String>,

    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// 必填字段
    pub fn required(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            alternate_labels: Vec::new(),
            required: true,
        }
    }

    /// 可选字段
    pub fn optional(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            alternate_labels: Vec::new(),
            required: false,
        }
    }

    /// 追加别名
    pub fn with_alternates<I, S>(mut self, alternates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternate_labels
            .extend(alternates.into_iter().map(Into::into));
        self
    }
}

// ==========================================
// FieldSchema - 字段集合（已校验）
// ==========================================
// 只能通过 new / from_parts 构造，保证 key 唯一且非空
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    /// 构造字段集合
    ///
    /// # 返回
    /// - Err(EmptyFieldKey): 存在空白 key
    /// - Err(ReservedFieldKey): key 与行号键 id 冲突
    /// - Err(DuplicateFieldKey): key 重复
    pub fn new(fields: Vec<FieldSpec>) -> ImportResult<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.key.trim().is_empty() {
                return Err(ImportError::EmptyFieldKey(field.label.clone()));
            }
            if field.key == ROW_ID_KEY {
                return Err(ImportError::ReservedFieldKey(field.key.clone()));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(ImportError::DuplicateFieldKey(field.key.clone()));
            }
        }

        Ok(Self { fields })
    }

    /// 合并内置字段与自定义字段（内置在前）
    pub fn from_parts(built_in: Vec<FieldSpec>, custom: Vec<FieldSpec>) -> ImportResult<Self> {
        let mut fields = built_in;
        fields.extend(custom);
        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
