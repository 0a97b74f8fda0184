// ==========================================
// Excel 导入列映射引擎 - 命令行入口
// ==========================================
// 流程: 读取配置 → 上传 → 选表 → 手动映射 → 下一步 → 预览/提交
// 输出: stdout 为 JSON，日志输出到 stderr
// ==========================================

use anyhow::{bail, Context, Result};
use clap::Parser;
use excel_import::logging::{self, LogFormat};
use excel_import::{
    AdvanceOutcome, ImportConfig, ImportOrchestrator, JsonFileSubmitHandler, LoadOutcome,
    SubmitResult,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "excel-import")]
#[command(author, version)]
#[command(about = "Excel 导入列映射: 自动匹配列、预览并导出映射结果")]
struct Cli {
    /// 待导入的表格文件（.xlsx/.xls/.ods/.csv）
    file: PathBuf,

    /// 字段配置 JSON 文件
    #[arg(long, short = 's')]
    schema: PathBuf,

    /// 工作表名（默认第一个）
    #[arg(long)]
    sheet: Option<String>,

    /// 手动映射，格式 COLUMN=FIELD，可重复
    #[arg(long = "map", value_name = "COLUMN=FIELD")]
    mappings: Vec<String>,

    /// 取消某列的映射，可重复
    #[arg(long = "unmap", value_name = "COLUMN")]
    unmaps: Vec<String>,

    /// 预览页码（1 起始）
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// 预览每页行数（默认取配置）
    #[arg(long)]
    page_size: Option<usize>,

    /// 提交输出文件；不指定时仅打印预览
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    json_log: bool,

    /// 默认日志级别（RUST_LOG 优先）
    #[arg(long, default_value = logging::DEFAULT_LEVEL)]
    log_level: String,
}

fn parse_mapping(entry: &str) -> Result<(&str, &str)> {
    match entry.split_once('=') {
        Some((column, field)) if !column.is_empty() && !field.is_empty() => Ok((column, field)),
        _ => bail!("映射格式错误: {}（期望 COLUMN=FIELD）", entry),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_log {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    logging::init_with(format, &cli.log_level);

    tracing::info!("{} v{}", excel_import::APP_NAME, excel_import::VERSION);

    let config = ImportConfig::from_file(&cli.schema)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("import-output.json"));
    let orchestrator =
        ImportOrchestrator::from_config(&config, Box::new(JsonFileSubmitHandler::new(output)))?;

    // 上传
    let file_name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let bytes = tokio::fs::read(&cli.file)
        .await
        .with_context(|| format!("无法读取文件: {}", cli.file.display()))?;

    match orchestrator.load_file(&file_name, bytes).await? {
        LoadOutcome::Loaded { .. } => {}
        LoadOutcome::DecodeFailed { message } => bail!("文件解码失败: {}", message),
        LoadOutcome::Discarded => bail!("文件加载被中断"),
    }

    // 选表
    if let Some(sheet) = &cli.sheet {
        orchestrator.select_sheet(sheet)?;
    }

    // 手动映射
    for column in &cli.unmaps {
        orchestrator.edit_mapping(column, None)?;
    }
    for entry in &cli.mappings {
        let (column, field) = parse_mapping(entry)?;
        orchestrator.edit_mapping(column, Some(field))?;
    }

    let snapshot = orchestrator.snapshot()?;
    if snapshot.columns.is_empty() {
        tracing::warn!(sheet = ?snapshot.current_sheet, "未找到列或数据行");
    }
    eprintln!("{}", serde_json::to_string_pretty(&snapshot.mapping)?);

    // 下一步
    match orchestrator.advance()? {
        AdvanceOutcome::Previewing { row_count } => {
            tracing::info!(rows = row_count, "映射校验通过");
        }
        AdvanceOutcome::Blocked { unsatisfied } => {
            let missing: Vec<String> = unsatisfied
                .iter()
                .map(|f| format!("{} ({})", f.label, f.key))
                .collect();
            bail!("请映射必填字段: {}", missing.join(", "));
        }
    }

    // 预览或提交
    if cli.output.is_some() {
        match orchestrator.submit().await? {
            SubmitResult::Submitted { row_count, message } => {
                let summary = serde_json::json!({
                    "submitted": row_count,
                    "message": message,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            SubmitResult::Discarded => bail!("提交结果已作废"),
        }
    } else {
        let page = orchestrator.preview_page(cli.page, cli.page_size)?;
        println!("{}", serde_json::to_string_pretty(&page)?);
    }

    Ok(())
}
