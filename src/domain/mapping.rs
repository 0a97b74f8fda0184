// ==========================================
// Excel 导入列映射引擎 - 列映射
// ==========================================
// ColumnMapping: 字段 key → 表格列名
// 红线: 单射（两个字段不能映射到同一列）
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    entries: BTreeMap<String, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 字段当前映射的列
    pub fn column_for(&self, field_key: &str) -> Option<&str> {
        self.entries.get(field_key).map(String::as_str)
    }

    /// 列当前被哪个字段占用
    pub fn field_for_column(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| c.as_str() == column)
            .map(|(k, _)| k.as_str())
    }

    pub fn contains_field(&self, field_key: &str) -> bool {
        self.entries.contains_key(field_key)
    }

    pub fn is_column_mapped(&self, column: &str) -> bool {
        self.field_for_column(column).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 是否满足单射约束
    pub fn is_injective(&self) -> bool {
        let mut columns: Vec<&str> = self.entries.values().map(String::as_str).collect();
        columns.sort_unstable();
        columns.windows(2).all(|w| w[0] != w[1])
    }

    // 以下原语仅供引擎/编排器使用，单射性由调用方保证
    pub(crate) fn set(&mut self, field_key: &str, column: &str) {
        self.entries
            .insert(field_key.to_string(), column.to_string());
    }

    pub(crate) fn release_column(&mut self, column: &str) {
        self.entries.retain(|_, c| c != column);
    }

    pub(crate) fn retain_fields<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.entries.retain(|k, _| keep(k.as_str()));
    }
}

impl<K, C> FromIterator<(K, C)> for ColumnMapping
where
    K: Into<String>,
    C: Into<String>,
{
    /// 直接构造（测试/反序列化场景），不做单射校验
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, c)| (k.into(), c.into()))
                .collect(),
        }
    }
}
