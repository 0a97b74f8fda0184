// ==========================================
// Excel 导入列映射引擎 - 工作簿解码器实现
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xlsb/.xls/.ods) / CSV (.csv/.txt) / TSV (.tsv)
// 职责: 原始字节 → 工作表名 + 行记录（首行为表头）
// ==========================================

use crate::domain::cell::CellValue;
use crate::domain::row::RawRow;
use crate::domain::workbook::Workbook;
use crate::importer::collaborator_trait::WorkbookLoader;
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, instrument};

/// 空表头列名
pub const EMPTY_HEADER: &str = "__EMPTY";

/// CSV 文件的唯一工作表名
pub const CSV_SHEET_NAME: &str = "Sheet1";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// ==========================================
// LoaderOptions - 解码选项
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// 文本单元格去首尾空白
    pub trim_text: bool,

    /// 跳过完全空白的数据行
    pub skip_blank_rows: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            trim_text: true,
            skip_blank_rows: true,
        }
    }
}

// ==========================================
// 格式识别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Excel,
    Csv { delimiter: u8 },
}

impl SpreadsheetFormat {
    /// 识别文件格式（魔数优先，其次扩展名）
    pub fn detect(file_name: &str, bytes: &[u8]) -> ImportResult<Self> {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            return Ok(SpreadsheetFormat::Excel);
        }

        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "xlam" | "ods" => {
                Ok(SpreadsheetFormat::Excel)
            }
            "csv" | "txt" => Ok(SpreadsheetFormat::Csv { delimiter: b',' }),
            "tsv" => Ok(SpreadsheetFormat::Csv { delimiter: b'\t' }),
            // 无扩展名或未知扩展名：可按文本读取时按 CSV 处理
            _ if std::str::from_utf8(bytes).is_ok() => {
                Ok(SpreadsheetFormat::Csv { delimiter: b',' })
            }
            _ => Err(ImportError::UnsupportedFormat(if ext.is_empty() {
                file_name.to_string()
            } else {
                ext
            })),
        }
    }
}

// ==========================================
// 表头处理
// ==========================================

/// 规范化表头: 空表头命名为 __EMPTY，重复表头追加 _1、_2 ...
pub fn dedupe_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for header in raw {
        let base = if header.is_empty() {
            EMPTY_HEADER.to_string()
        } else {
            header
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        seen.insert(name.clone());
        headers.push(name);
    }

    headers
}

// ==========================================
// CSV 解码
// ==========================================
pub fn decode_csv(bytes: &[u8], delimiter: u8, options: &LoaderOptions) -> ImportResult<Workbook> {
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // 允许行长度不一致
        .delimiter(delimiter)
        .from_reader(content);

    let mut records = reader.records();
    let mut workbook = Workbook::new();

    // 读取表头
    let headers = match records.next() {
        Some(header) => dedupe_headers(header?.iter().map(|h| h.trim().to_string())),
        None => {
            workbook.push_sheet(CSV_SHEET_NAME, Vec::new());
            return Ok(workbook);
        }
    };

    // 读取数据行
    let mut rows = Vec::new();
    for result in records {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let value = record
                    .get(idx)
                    .map(|v| CellValue::from_csv_field(v, options.trim_text))
                    .unwrap_or(CellValue::Null);
                (header.clone(), value)
            })
            .collect();

        if options.skip_blank_rows && row.is_blank() {
            continue;
        }
        rows.push(row);
    }

    workbook.push_sheet(CSV_SHEET_NAME, rows);
    Ok(workbook)
}

// ==========================================
// Excel 解码
// ==========================================
pub fn decode_excel(bytes: Vec<u8>, options: &LoaderOptions) -> ImportResult<Workbook> {
    let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_names = sheets.sheet_names();
    if sheet_names.is_empty() {
        return Err(ImportError::EmptyWorkbook);
    }

    let mut workbook = Workbook::new();
    for sheet_name in sheet_names {
        let range = sheets
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(format!("{}: {}", sheet_name, e)))?;

        // 提取表头（第一行）
        let mut range_rows = range.rows();
        let headers = match range_rows.next() {
            Some(header_row) => {
                dedupe_headers(header_row.iter().map(|cell| cell.to_string().trim().to_string()))
            }
            None => {
                workbook.push_sheet(sheet_name, Vec::new());
                continue;
            }
        };

        // 读取数据行
        let mut rows = Vec::new();
        for data_row in range_rows {
            let row: RawRow = headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let value = data_row
                        .get(idx)
                        .map(|cell| cell_from_data(cell, options))
                        .unwrap_or(CellValue::Null);
                    (header.clone(), value)
                })
                .collect();

            if options.skip_blank_rows && row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        debug!(sheet = %sheet_name, rows = rows.len(), "工作表解码完成");
        workbook.push_sheet(sheet_name, rows);
    }

    Ok(workbook)
}

/// calamine 单元格 → CellValue
fn cell_from_data(cell: &Data, options: &LoaderOptions) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => {
            let text = if options.trim_text { s.trim() } else { s.as_str() };
            if text.trim().is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(text.to_string())
            }
        }
        Data::DateTime(dt) => {
            if dt.is_duration() {
                return CellValue::Number(dt.as_f64());
            }
            match dt.as_datetime() {
                Some(naive) if naive.time() == chrono::NaiveTime::MIN => {
                    CellValue::Text(naive.format("%Y-%m-%d").to_string())
                }
                Some(naive) => CellValue::Text(naive.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => CellValue::Number(dt.as_f64()),
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// 同步解码（按格式分派）
pub fn decode_bytes(
    file_name: &str,
    bytes: Vec<u8>,
    options: &LoaderOptions,
) -> ImportResult<Workbook> {
    match SpreadsheetFormat::detect(file_name, &bytes)? {
        SpreadsheetFormat::Excel => decode_excel(bytes, options),
        SpreadsheetFormat::Csv { delimiter } => decode_csv(&bytes, delimiter, options),
    }
}

// ==========================================
// UniversalWorkbookLoader - 通用解码器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct UniversalWorkbookLoader {
    options: LoaderOptions,
}

impl UniversalWorkbookLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }
}

#[async_trait]
impl WorkbookLoader for UniversalWorkbookLoader {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn decode(&self, file_name: &str, bytes: Vec<u8>) -> ImportResult<Workbook> {
        let options = self.options;
        let name = file_name.to_string();

        // 解码为 CPU 密集操作，移出异步线程
        let workbook = tokio::task::spawn_blocking(move || decode_bytes(&name, bytes, &options))
            .await
            .map_err(|e| ImportError::InternalError(format!("解码任务异常: {}", e)))??;

        info!(
            file_name = %file_name,
            sheets = workbook.sheet_names().len(),
            "工作簿解码完成"
        );
        Ok(workbook)
    }
}
