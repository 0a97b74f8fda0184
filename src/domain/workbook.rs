// ==========================================
// Excel 导入列映射引擎 - 工作簿
// ==========================================
// 解码结果: 有序工作表名 + 表名 → 行序列
// ==========================================

use crate::domain::row::RawRow;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheet_names: Vec<String>,
    sheets_by_name: HashMap<String, Vec<RawRow>>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加工作表；同名表覆盖行数据，顺序保持首次出现位置
    pub fn push_sheet(&mut self, name: impl Into<String>, rows: Vec<RawRow>) {
        let name = name.into();
        if !self.sheets_by_name.contains_key(&name) {
            self.sheet_names.push(name.clone());
        }
        self.sheets_by_name.insert(name, rows);
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn first_sheet(&self) -> Option<&str> {
        self.sheet_names.first().map(String::as_str)
    }

    pub fn rows(&self, sheet: &str) -> Option<&[RawRow]> {
        self.sheets_by_name.get(sheet).map(Vec::as_slice)
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.sheets_by_name.contains_key(sheet)
    }

    pub fn is_empty(&self) -> bool {
        self.sheet_names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_order_and_lookup() {
        let mut workbook = Workbook::new();
        assert!(workbook.is_empty());
        workbook.push_sheet("Contacts", vec![RawRow::new()]);
        workbook.push_sheet("Archive", Vec::new());

        assert_eq!(workbook.sheet_names(), &["Contacts".to_string(), "Archive".to_string()]);
        assert_eq!(workbook.first_sheet(), Some("Contacts"));
        assert_eq!(workbook.rows("Contacts").map(|r| r.len()), Some(1));
        assert!(workbook.rows("Missing").is_none());
        assert!(!workbook.is_empty());
    }

    #[test]
    fn test_push_same_sheet_twice_keeps_single_name() {
        let mut workbook = Workbook::new();
        workbook.push_sheet("S", Vec::new());
        workbook.push_sheet("S", vec![RawRow::new()]);

        assert_eq!(workbook.sheet_names().len(), 1);
        assert_eq!(workbook.rows("S").map(|r| r.len()), Some(1));
    }
}
