// ==========================================
// Excel 导入列映射引擎 - 导入编排器
// ==========================================
// 状态机: Upload(初始) → Preview → (提交成功) 完全重置回 Upload
// 职责: 串联 工作簿解码 → 映射引擎 → 提交处理，独占导入会话
// ==========================================
// 红线:
// - 同一时刻最多一个解码/提交在途，其余变更操作返回 Busy
// - cancel 立即重置会话；在途操作返回后结果作废（按 generation 判定）
// - 映射或行集变化后立即同步重算投影
// ==========================================

use crate::config::ImportConfig;
use crate::domain::field::{FieldSchema, FieldSpec};
use crate::domain::mapping::ColumnMapping;
use crate::domain::row::ProjectedRow;
use crate::domain::session::{ImportSession, SessionSnapshot};
use crate::domain::types::{BusyOperation, ImportStep};
use crate::engine::mapping_engine::MappingEngine;
use crate::engine::preview::{paginate, PreviewPage};
use crate::importer::collaborator_trait::{
    RowFormatter, SubmitHandler, SubmitOutcome, WorkbookLoader,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::submit_handler::PassThroughFormatter;
use crate::importer::workbook_loader::UniversalWorkbookLoader;
use futures::future::try_join_all;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

// ==========================================
// 操作结果
// ==========================================

/// 上传结果
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// 解码成功，已选中首个工作表
    Loaded {
        sheet_count: usize,
        row_count: usize,
        mapped_fields: usize,
    },
    /// 解码失败，行集已清空（非致命）
    DecodeFailed { message: String },
    /// 在途期间会话被取消/重置，结果作废
    Discarded,
}

/// 下一步结果
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// 已进入 Preview
    Previewing { row_count: usize },
    /// 存在未映射的必填字段，停留在 Upload
    Blocked { unsatisfied: Vec<FieldSpec> },
}

/// 提交结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    /// 处理方已接受，会话已完全重置
    Submitted {
        row_count: usize,
        message: Option<String>,
    },
    /// 在途期间会话被取消/重置，结果作废
    Discarded,
}

// ==========================================
// 编排器内部状态
// ==========================================
struct OrchestratorState {
    session: ImportSession,
    schema: FieldSchema,
    in_flight: Option<BusyOperation>,
    /// 每次重置递增，用于识别过期的在途结果
    generation: u64,
}

impl OrchestratorState {
    fn ensure_idle(&self) -> ImportResult<()> {
        match self.in_flight {
            Some(op) => Err(ImportError::Busy(op.to_string())),
            None => Ok(()),
        }
    }

    fn ensure_step(&self, expected: ImportStep) -> ImportResult<()> {
        if self.session.step != expected {
            return Err(ImportError::InvalidStep {
                expected: expected.to_string(),
                actual: self.session.step.to_string(),
            });
        }
        Ok(())
    }

    /// 完全重置会话并作废在途结果（在途标记保持，待其返回时释放）
    fn invalidate(&mut self) {
        self.session.reset();
        self.generation += 1;
    }

    /// 切换到指定工作表: 加载行 → 清空映射 → 自动建议 → 投影
    fn activate_sheet(&mut self, engine: &MappingEngine, sheet: &str) {
        let rows = self
            .session
            .workbook
            .as_ref()
            .and_then(|wb| wb.rows(sheet))
            .map(|rows| rows.to_vec())
            .unwrap_or_default();

        self.session.current_sheet = Some(sheet.to_string());
        self.session.raw_rows = rows;
        self.session.clear_mapping();
        self.auto_suggest_if_allowed(engine);
        self.refresh_projection(engine);
    }

    /// 未手动编辑过时才自动建议
    fn auto_suggest_if_allowed(&mut self, engine: &MappingEngine) {
        if self.session.manually_edited {
            debug!("映射已手动编辑，跳过自动建议");
            return;
        }
        self.session.mapping =
            engine.auto_suggest_mapping(&self.session.raw_rows, self.schema.fields());
    }

    fn refresh_projection(&mut self, engine: &MappingEngine) {
        self.session.projection = engine.project(&self.session.raw_rows, &self.session.mapping);
    }
}

// ==========================================
// InFlightSlot - 在途标记守卫
// ==========================================
// 在途 future 被调用方丢弃（超时/select!）时，Drop 释放在途标记
struct InFlightSlot<'a> {
    state: &'a Mutex<OrchestratorState>,
    armed: bool,
}

impl<'a> InFlightSlot<'a> {
    /// 占用在途标记（调用方已持锁并完成 ensure_idle）
    fn claim(
        state: &'a Mutex<OrchestratorState>,
        guard: &mut OrchestratorState,
        op: BusyOperation,
    ) -> Self {
        guard.in_flight = Some(op);
        Self { state, armed: true }
    }

    /// 正常返回路径: 在已持有的锁内释放
    fn release(mut self, guard: &mut OrchestratorState) {
        self.armed = false;
        guard.in_flight = None;
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.in_flight = None;
        warn!("在途操作被中途丢弃，已释放在途标记");
    }
}

// ==========================================
// ImportOrchestrator - 导入编排器
// ==========================================
pub struct ImportOrchestrator {
    engine: MappingEngine,
    loader: Box<dyn WorkbookLoader>,
    handler: Box<dyn SubmitHandler>,
    formatter: Box<dyn RowFormatter>,
    preview_page_size: usize,
    state: Mutex<OrchestratorState>,
}

impl ImportOrchestrator {
    /// 创建新的编排器实例
    ///
    /// # 参数
    /// - schema: 已校验的字段集合
    /// - loader: 工作簿解码器
    /// - handler: 提交处理方
    pub fn new(
        schema: FieldSchema,
        loader: Box<dyn WorkbookLoader>,
        handler: Box<dyn SubmitHandler>,
    ) -> Self {
        Self {
            engine: MappingEngine::new(),
            loader,
            handler,
            formatter: Box::new(PassThroughFormatter),
            preview_page_size: crate::config::defaults::PREVIEW_PAGE_SIZE,
            state: Mutex::new(OrchestratorState {
                session: ImportSession::new(),
                schema,
                in_flight: None,
                generation: 0,
            }),
        }
    }

    /// 按配置创建（通用解码器 + 配置中的字段集合）
    pub fn from_config(
        config: &ImportConfig,
        handler: Box<dyn SubmitHandler>,
    ) -> ImportResult<Self> {
        config.validate()?;
        let schema = config.schema()?;
        let loader = UniversalWorkbookLoader::new(config.loader_options());

        Ok(Self::new(schema, Box::new(loader), handler)
            .with_preview_page_size(config.preview_page_size))
    }

    /// 替换行格式化器
    pub fn with_formatter(mut self, formatter: Box<dyn RowFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_preview_page_size(mut self, page_size: usize) -> Self {
        self.preview_page_size = page_size.max(1);
        self
    }

    fn lock(&self) -> ImportResult<MutexGuard<'_, OrchestratorState>> {
        self.state
            .lock()
            .map_err(|e| ImportError::LockPoisoned(e.to_string()))
    }

    // ==========================================
    // 上传
    // ==========================================

    /// 上传文件（重新上传即完全重置）
    ///
    /// 解码成功: 填充表名，选中首个工作表，自动建议映射
    /// 解码失败: 行集为空，错误记录在会话中，返回 DecodeFailed
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn load_file(&self, file_name: &str, bytes: Vec<u8>) -> ImportResult<LoadOutcome> {
        let (ticket, slot) = {
            let mut state = self.lock()?;
            state.ensure_idle()?;
            state.ensure_step(ImportStep::Upload)?;

            state.invalidate();
            state.session.file_name = Some(file_name.to_string());
            let slot = InFlightSlot::claim(&self.state, &mut state, BusyOperation::LoadingFile);
            (state.generation, slot)
        };

        info!(file_name = %file_name, "开始解码上传文件");
        let decoded = match self.loader.decode(file_name, bytes).await {
            Ok(workbook) if workbook.is_empty() => Err(ImportError::EmptyWorkbook),
            other => other,
        };

        let mut state = self.lock()?;
        slot.release(&mut state);

        if state.generation != ticket {
            info!(file_name = %file_name, "会话已重置，丢弃解码结果");
            return Ok(LoadOutcome::Discarded);
        }

        match decoded {
            Ok(workbook) => {
                let first_sheet = workbook.first_sheet().map(str::to_string);
                state.session.sheet_names = workbook.sheet_names().to_vec();
                state.session.workbook = Some(workbook);

                if let Some(sheet) = first_sheet {
                    state.activate_sheet(&self.engine, &sheet);
                }

                let outcome = LoadOutcome::Loaded {
                    sheet_count: state.session.sheet_names.len(),
                    row_count: state.session.raw_rows.len(),
                    mapped_fields: state.session.mapping.len(),
                };
                info!(?outcome, "文件加载完成");
                Ok(outcome)
            }
            Err(e) => {
                warn!(file_name = %file_name, error = %e, "文件解码失败");
                let message = e.to_string();
                state.session.raw_rows.clear();
                state.session.clear_mapping();
                state.session.last_error = Some(message.clone());
                Ok(LoadOutcome::DecodeFailed { message })
            }
        }
    }

    /// 切换工作表（清空映射与投影，重新自动建议）
    #[instrument(skip(self))]
    pub fn select_sheet(&self, sheet: &str) -> ImportResult<()> {
        let mut state = self.lock()?;
        state.ensure_idle()?;
        state.ensure_step(ImportStep::Upload)?;

        let workbook = state.session.workbook.as_ref().ok_or(ImportError::NoWorkbook)?;
        if !workbook.has_sheet(sheet) {
            return Err(ImportError::UnknownSheet(sheet.to_string()));
        }

        state.activate_sheet(&self.engine, sheet);
        debug!(
            rows = state.session.raw_rows.len(),
            mapped = state.session.mapping.len(),
            "工作表已切换"
        );
        Ok(())
    }

    // ==========================================
    // 映射
    // ==========================================

    /// 编辑某列的字段归属（None 表示取消映射）
    #[instrument(skip(self))]
    pub fn edit_mapping(
        &self,
        column: &str,
        field_key: Option<&str>,
    ) -> ImportResult<ColumnMapping> {
        let mut state = self.lock()?;
        state.ensure_idle()?;
        state.ensure_step(ImportStep::Upload)?;

        // 取消映射不校验列名；指派字段时列必须存在于当前表头
        if let Some(key) = field_key {
            if !state.schema.contains(key) {
                return Err(ImportError::UnknownField(key.to_string()));
            }
            if !state.session.columns().iter().any(|c| c == column) {
                return Err(ImportError::UnknownColumn(column.to_string()));
            }
        }

        let next = self
            .engine
            .apply_column_edit(&state.session.mapping, column, field_key);
        state.session.mapping = next;
        state.session.manually_edited = true;
        state.refresh_projection(&self.engine);

        Ok(state.session.mapping.clone())
    }

    /// 替换字段集合
    ///
    /// - 已不存在的字段从映射中移除
    /// - 未手动编辑过时按新字段集合重新自动建议
    #[instrument(skip(self, schema), fields(field_count = schema.len()))]
    pub fn replace_schema(&self, schema: FieldSchema) -> ImportResult<()> {
        let mut state = self.lock()?;
        state.ensure_idle()?;
        state.ensure_step(ImportStep::Upload)?;

        state.session.mapping.retain_fields(|key| schema.contains(key));
        state.schema = schema;
        state.auto_suggest_if_allowed(&self.engine);
        state.refresh_projection(&self.engine);
        Ok(())
    }

    // ==========================================
    // 步骤切换
    // ==========================================

    /// 下一步: 必填字段全部映射时进入 Preview 并快照投影
    #[instrument(skip(self))]
    pub fn advance(&self) -> ImportResult<AdvanceOutcome> {
        let mut state = self.lock()?;
        state.ensure_idle()?;
        state.ensure_step(ImportStep::Upload)?;

        if !state.session.has_file() {
            return Err(ImportError::NoWorkbook);
        }

        let unsatisfied = self
            .engine
            .validate_required(&state.session.mapping, state.schema.fields());
        if !unsatisfied.is_empty() {
            warn!(
                missing = ?unsatisfied.iter().map(|f| f.key.as_str()).collect::<Vec<_>>(),
                "必填字段未映射"
            );
            return Ok(AdvanceOutcome::Blocked { unsatisfied });
        }

        state.session.preview = state.session.projection.clone();
        state.session.step = ImportStep::Preview;
        Ok(AdvanceOutcome::Previewing {
            row_count: state.session.preview.len(),
        })
    }

    /// 返回 Upload（保留映射以便继续编辑）
    pub fn back(&self) -> ImportResult<()> {
        let mut state = self.lock()?;
        state.ensure_idle()?;
        state.ensure_step(ImportStep::Preview)?;

        state.session.step = ImportStep::Upload;
        state.session.preview.clear();
        state.session.last_error = None;
        Ok(())
    }

    /// 取消: 任意时刻可用，丢弃全部进行中的状态
    pub fn cancel(&self) -> ImportResult<()> {
        let mut state = self.lock()?;
        state.invalidate();
        info!(in_flight = ?state.in_flight, "导入已取消");
        Ok(())
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交全部投影行（非当前页）
    ///
    /// - 成功: 会话完全重置
    /// - 处理方拒绝/异常: 停留在 Preview，错误写入会话并返回
    #[instrument(skip(self))]
    pub async fn submit(&self) -> ImportResult<SubmitResult> {
        let (ticket, rows, slot) = {
            let mut state = self.lock()?;
            state.ensure_idle()?;
            state.ensure_step(ImportStep::Preview)?;

            if state.session.projection.is_empty() {
                let err = ImportError::NothingToImport;
                state.session.last_error = Some(err.to_string());
                return Err(err);
            }

            state.session.last_error = None;
            let slot = InFlightSlot::claim(&self.state, &mut state, BusyOperation::Submitting);
            (state.generation, state.session.projection.clone(), slot)
        };

        let row_count = rows.len();
        info!(rows = row_count, "开始提交");
        let result = self.deliver(rows).await;

        let mut state = self.lock()?;
        slot.release(&mut state);

        if state.generation != ticket {
            info!("会话已重置，丢弃提交结果");
            return Ok(SubmitResult::Discarded);
        }

        match result {
            Ok(SubmitOutcome {
                accepted: true,
                message,
            }) => {
                info!(rows = row_count, "提交成功");
                state.invalidate();
                Ok(SubmitResult::Submitted { row_count, message })
            }
            Ok(SubmitOutcome {
                accepted: false,
                message,
            }) => {
                let message = message.unwrap_or_else(|| "处理方未返回原因".to_string());
                warn!(reason = %message, "提交被拒绝");
                state.session.last_error = Some(message.clone());
                Err(ImportError::SubmitRejected(message))
            }
            Err(e) => {
                let message = format!("{:#}", e);
                warn!(error = %message, "提交异常");
                state.session.last_error = Some(message.clone());
                Err(ImportError::SubmitFailed(message))
            }
        }
    }

    /// 逐行格式化后交给处理方
    async fn deliver(&self, rows: Vec<ProjectedRow>) -> anyhow::Result<SubmitOutcome> {
        let formatted =
            try_join_all(rows.into_iter().map(|row| self.formatter.format(row))).await?;
        self.handler.submit(formatted).await
    }

    // ==========================================
    // 只读视图
    // ==========================================

    /// 当前会话快照
    pub fn snapshot(&self) -> ImportResult<SessionSnapshot> {
        let state = self.lock()?;
        let session = &state.session;

        Ok(SessionSnapshot {
            session_id: session.session_id.clone(),
            created_at: session.created_at,
            step: session.step,
            file_name: session.file_name.clone(),
            sheet_names: session.sheet_names.clone(),
            current_sheet: session.current_sheet.clone(),
            columns: session.columns(),
            mapping: session.mapping.clone(),
            projection: session.projection.clone(),
            unsatisfied_required: self
                .engine
                .validate_required(&session.mapping, state.schema.fields()),
            busy: state.in_flight,
            last_error: session.last_error.clone(),
            manually_edited: session.manually_edited,
        })
    }

    /// 某列下拉可选字段
    pub fn column_options(&self, column: &str) -> ImportResult<Vec<FieldSpec>> {
        let state = self.lock()?;
        Ok(self
            .engine
            .available_field_options(&state.session.mapping, state.schema.fields(), column))
    }

    /// Preview 快照分页（page_size 为空时取配置值）
    pub fn preview_page(
        &self,
        page: usize,
        page_size: Option<usize>,
    ) -> ImportResult<PreviewPage> {
        let state = self.lock()?;
        state.ensure_step(ImportStep::Preview)?;

        let size = page_size.unwrap_or(self.preview_page_size);
        Ok(paginate(&state.session.preview, page, size))
    }

    pub fn schema(&self) -> ImportResult<FieldSchema> {
        Ok(self.lock()?.schema.clone())
    }

    pub fn step(&self) -> ImportResult<ImportStep> {
        Ok(self.lock()?.session.step)
    }

    pub fn is_busy(&self) -> ImportResult<bool> {
        Ok(self.lock()?.in_flight.is_some())
    }
}
