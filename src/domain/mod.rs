// ==========================================
// Excel 导入列映射引擎 - 领域模型层
// ==========================================
// 职责: 定义字段、行、映射、会话等领域类型
// 红线: 不含解码逻辑,不含映射算法
// ==========================================

pub mod cell;
pub mod field;
pub mod mapping;
pub mod row;
pub mod session;
pub mod types;
pub mod workbook;

// 重导出核心类型
pub use cell::CellValue;
pub use field::{FieldSchema, FieldSpec, ROW_ID_KEY};
pub use mapping::ColumnMapping;
pub use row::{header_columns, ProjectedRow, RawRow};
pub use session::{ImportSession, SessionSnapshot};
pub use types::{BusyOperation, ImportStep};
pub use workbook::Workbook;
