// ==========================================
// Excel 导入列映射引擎 - 错误类型
// ==========================================
// 分类: 解码失败 / 契约违规 / 会话流程 / 提交失败 / 配置
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件解码错误 =====
    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xlsb/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作簿无工作表")]
    EmptyWorkbook,

    // ===== 字段契约错误（构造期即拒绝）=====
    #[error("字段 key 不能为空 (label: {0})")]
    EmptyFieldKey(String),

    #[error("字段 key 重复: {0}")]
    DuplicateFieldKey(String),

    #[error("字段 key 为保留字: {0}（投影行的行号列）")]
    ReservedFieldKey(String),

    #[error("未知字段: {0}")]
    UnknownField(String),

    #[error("当前工作表不存在该列: {0}")]
    UnknownColumn(String),

    // ===== 会话流程错误 =====
    #[error("尚未上传文件")]
    NoWorkbook,

    #[error("工作表不存在: {0}")]
    UnknownSheet(String),

    #[error("正在执行 {0}，请稍后再试")]
    Busy(String),

    #[error("当前步骤不允许该操作 (期望 {expected}, 实际 {actual})")]
    InvalidStep { expected: String, actual: String },

    // ===== 提交错误 =====
    #[error("没有可导入的数据")]
    NothingToImport,

    #[error("提交被拒绝: {0}")]
    SubmitRejected(String),

    #[error("提交失败: {0}")]
    SubmitFailed(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (source: {source_name}): {message}")]
    ConfigReadError {
        source_name: String,
        message: String,
    },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error("锁获取失败: {0}")]
    LockPoisoned(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为解码阶段错误（会话保持在 Upload，行集清空）
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
                | ImportError::EmptyWorkbook
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ConfigReadError {
            source_name: "json".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
