// ==========================================
// Excel 导入列映射引擎 - 预览分页
// ==========================================
// 页码 1 起始；serial 为跨页连续的序号（SN 列）
// ==========================================

use crate::domain::row::ProjectedRow;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub serial: usize,
    #[serde(flatten)]
    pub row: ProjectedRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewPage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub rows: Vec<PreviewRow>,
}

impl PreviewPage {
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }
}

/// 对投影行分页
///
/// - page 为 0 时按第 1 页处理
/// - page_size 为 0 时返回空页
/// - 越界页返回空行集，total 不变
pub fn paginate(rows: &[ProjectedRow], page: usize, page_size: usize) -> PreviewPage {
    let page = page.max(1);
    let start = (page - 1).saturating_mul(page_size);

    let page_rows = if page_size == 0 {
        Vec::new()
    } else {
        rows.iter()
            .skip(start)
            .take(page_size)
            .enumerate()
            .map(|(idx, row)| PreviewRow {
                serial: start + idx + 1,
                row: row.clone(),
            })
            .collect()
    };

    PreviewPage {
        page,
        page_size,
        total: rows.len(),
        rows: page_rows,
    }
}
