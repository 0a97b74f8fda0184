// ==========================================
// 导入编排器集成测试
// ==========================================
// 测试目标: 步骤状态机、在途互斥、取消作废、提交结果处理
// ==========================================


use excel_import::logging;
use excel_import::{
    AdvanceOutcome, BusyOperation, CellValue, FieldSchema, FieldSpec, ImportError,
    ImportOrchestrator, ImportStep, LoadOutcome, SubmitResult, Workbook,
};
use std::time::Duration;
use test_helpers::*;
use tokio::time::timeout;

/// 加载 Contacts 工作簿并进入 Preview
async fn orchestrator_in_preview(handler: ScriptedHandler) -> ImportOrchestrator {
    let orch = orchestrator_with(StaticLoader::new(contacts_workbook()), handler);
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();
    assert_eq!(
        orch.advance().unwrap(),
        AdvanceOutcome::Previewing { row_count: 3 }
    );
    orch
}

// ==========================================
// 上传与自动映射
// ==========================================

#[tokio::test]
async fn test_load_selects_first_sheet_and_auto_maps() {
    logging::init_test();

    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );

    let outcome = orch.load_file("contacts.xlsx", vec![1, 2, 3]).await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            sheet_count: 2,
            row_count: 3,
            mapped_fields: 3,
        }
    );

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Upload);
    assert_eq!(snapshot.file_name.as_deref(), Some("contacts.xlsx"));
    assert_eq!(snapshot.sheet_names, vec!["Contacts", "Other"]);
    assert_eq!(snapshot.current_sheet.as_deref(), Some("Contacts"));
    assert_eq!(snapshot.columns, vec!["Full Name", "E-mail", "Mobile"]);
    assert_eq!(snapshot.mapping.column_for("name"), Some("Full Name"));
    assert_eq!(snapshot.mapping.column_for("email"), Some("E-mail"));
    assert_eq!(snapshot.mapping.column_for("phone"), Some("Mobile"));
    assert_eq!(snapshot.row_count(), 3);
    assert!(snapshot.unsatisfied_required.is_empty());
    assert!(snapshot.can_advance());
    assert!(!snapshot.is_busy());
}

#[tokio::test]
async fn test_alternate_label_auto_mapping() {
    let fields = vec![FieldSpec::required("name", "Name").with_alternates(["full name"])];
    let orch = ImportOrchestrator::new(
        FieldSchema::new(fields).unwrap(),
        Box::new(StaticLoader::new(single_sheet_workbook(vec![row(&[(
            "Full Name",
            "x",
        )])]))),
        Box::new(ScriptedHandler::new(Script::Accept)),
    );

    orch.load_file("a.csv", vec![]).await.unwrap();

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.mapping.len(), 1);
    assert_eq!(snapshot.mapping.column_for("name"), Some("Full Name"));
}

#[tokio::test]
async fn test_unrecognised_header_blocks_advance() {
    let fields = vec![FieldSpec::required("name", "Name").with_alternates(["full name"])];
    let orch = ImportOrchestrator::new(
        FieldSchema::new(fields).unwrap(),
        Box::new(StaticLoader::new(single_sheet_workbook(vec![row(&[(
            "Unrelated",
            "x",
        )])]))),
        Box::new(ScriptedHandler::new(Script::Accept)),
    );

    orch.load_file("a.csv", vec![]).await.unwrap();
    assert!(orch.snapshot().unwrap().mapping.is_empty());

    match orch.advance().unwrap() {
        AdvanceOutcome::Blocked { unsatisfied } => {
            let keys: Vec<&str> = unsatisfied.iter().map(|f| f.key.as_str()).collect();
            assert_eq!(keys, vec!["name"]);
        }
        other => panic!("expected Blocked, got {:?}", other),
    }
    assert_eq!(orch.step().unwrap(), ImportStep::Upload);
}

#[tokio::test]
async fn test_decode_failure_leaves_empty_rows() {
    let orch = orchestrator_with(FailingLoader, ScriptedHandler::new(Script::Accept));

    let outcome = orch.load_file("broken.bin", vec![0xde, 0xad]).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::DecodeFailed { .. }));

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Upload);
    assert!(snapshot.sheet_names.is_empty());
    assert!(snapshot.columns.is_empty());
    assert!(snapshot.projection.is_empty());
    assert!(snapshot.mapping.is_empty());
    assert!(snapshot.last_error.is_some());
    assert!(!snapshot.is_busy());
}

#[tokio::test]
async fn test_empty_workbook_is_decode_failure() {
    let orch = orchestrator_with(
        StaticLoader::new(Workbook::new()),
        ScriptedHandler::new(Script::Accept),
    );

    let outcome = orch.load_file("empty.xlsx", vec![]).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::DecodeFailed { .. }));

    let snapshot = orch.snapshot().unwrap();
    assert!(snapshot.sheet_names.is_empty());
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn test_reload_resets_session() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );

    orch.load_file("first.xlsx", vec![]).await.unwrap();
    orch.edit_mapping("Mobile", None).unwrap();
    let first = orch.snapshot().unwrap();

    orch.load_file("second.xlsx", vec![]).await.unwrap();

    let snapshot = orch.snapshot().unwrap();
    assert_ne!(snapshot.session_id, first.session_id);
    assert!(snapshot.created_at >= first.created_at);
    assert_eq!(snapshot.file_name.as_deref(), Some("second.xlsx"));
    assert!(!snapshot.manually_edited);
    assert_eq!(snapshot.mapping.len(), 3);
}

// ==========================================
// 工作表与映射编辑
// ==========================================

#[tokio::test]
async fn test_sheet_change_clears_mapping_and_resuggests() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();
    orch.edit_mapping("Mobile", None).unwrap();

    orch.select_sheet("Other").unwrap();
    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.current_sheet.as_deref(), Some("Other"));
    assert_eq!(snapshot.columns, vec!["Col A", "Col B"]);
    assert!(snapshot.mapping.is_empty());
    assert!(!snapshot.manually_edited);
    assert_eq!(snapshot.projection.len(), 1);
    assert!(snapshot.projection[0].fields.is_empty());

    orch.select_sheet("Contacts").unwrap();
    assert_eq!(orch.snapshot().unwrap().mapping.len(), 3);
}

#[tokio::test]
async fn test_select_sheet_errors() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );

    assert!(matches!(
        orch.select_sheet("Contacts"),
        Err(ImportError::NoWorkbook)
    ));

    orch.load_file("contacts.xlsx", vec![]).await.unwrap();
    assert!(matches!(
        orch.select_sheet("Missing"),
        Err(ImportError::UnknownSheet(name)) if name == "Missing"
    ));
    assert_eq!(
        orch.snapshot().unwrap().current_sheet.as_deref(),
        Some("Contacts")
    );
}

#[tokio::test]
async fn test_edit_mapping_moves_field_and_reprojects() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();

    // email 改到 Full Name 列，name 随之失去映射
    let mapping = orch.edit_mapping("Full Name", Some("email")).unwrap();
    assert_eq!(mapping.column_for("email"), Some("Full Name"));
    assert_eq!(mapping.column_for("name"), None);
    assert!(!mapping.is_column_mapped("E-mail"));
    assert!(mapping.is_injective());

    let snapshot = orch.snapshot().unwrap();
    assert!(snapshot.manually_edited);
    assert_eq!(
        snapshot.projection[0].get("email"),
        Some(&CellValue::from("Bob"))
    );
    assert_eq!(snapshot.projection[0].get("name"), None);
    let missing: Vec<&str> = snapshot
        .unsatisfied_required
        .iter()
        .map(|f| f.key.as_str())
        .collect();
    assert_eq!(missing, vec!["name"]);
}

#[tokio::test]
async fn test_edit_mapping_unknown_field() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();

    let before = orch.snapshot().unwrap().mapping;
    assert!(matches!(
        orch.edit_mapping("Mobile", Some("fax")),
        Err(ImportError::UnknownField(key)) if key == "fax"
    ));
    assert_eq!(orch.snapshot().unwrap().mapping, before);
}

#[tokio::test]
async fn test_edit_mapping_unknown_column() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();
    orch.edit_mapping("Full Name", None).unwrap();

    // 列名拼写错误不能满足必填校验
    assert!(matches!(
        orch.edit_mapping("Ful Name", Some("name")),
        Err(ImportError::UnknownColumn(column)) if column == "Ful Name"
    ));
    assert_eq!(orch.snapshot().unwrap().mapping.column_for("name"), None);
    assert!(matches!(
        orch.advance().unwrap(),
        AdvanceOutcome::Blocked { .. }
    ));

    // 取消映射不校验列名
    orch.edit_mapping("Ful Name", None).unwrap();
}

#[tokio::test]
async fn test_column_options() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();
    orch.edit_mapping("E-mail", None).unwrap();

    let keys = |column: &str| -> Vec<String> {
        orch.column_options(column)
            .unwrap()
            .into_iter()
            .map(|f| f.key)
            .collect()
    };

    assert_eq!(keys("E-mail"), vec!["email"]);
    assert_eq!(keys("Mobile"), vec!["email", "phone"]);
    assert_eq!(keys("Full Name"), vec!["name", "email"]);
}

#[tokio::test]
async fn test_replace_schema_keeps_manual_edits() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();
    orch.edit_mapping("E-mail", None).unwrap();

    let schema = FieldSchema::new(vec![
        FieldSpec::required("name", "Name").with_alternates(["full name"]),
        FieldSpec::required("email", "Email").with_alternates(["e-mail"]),
        FieldSpec::optional("company", "Company"),
    ])
    .unwrap();
    orch.replace_schema(schema).unwrap();

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.mapping.column_for("name"), Some("Full Name"));
    assert_eq!(snapshot.mapping.column_for("email"), None);
    assert_eq!(snapshot.mapping.column_for("phone"), None);
    assert!(snapshot.projection.iter().all(|r| r.get("phone").is_none()));
    assert_eq!(orch.schema().unwrap().len(), 3);
}

#[tokio::test]
async fn test_replace_schema_resuggests_without_manual_edits() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();

    let schema = FieldSchema::new(vec![
        FieldSpec::required("contact", "Contact").with_alternates(["full name"]),
        FieldSpec::optional("mobile", "Mobile"),
    ])
    .unwrap();
    orch.replace_schema(schema).unwrap();

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.mapping.len(), 2);
    assert_eq!(snapshot.mapping.column_for("contact"), Some("Full Name"));
    assert_eq!(snapshot.mapping.column_for("mobile"), Some("Mobile"));
    assert_eq!(
        snapshot.projection[2].get("contact"),
        Some(&CellValue::from("Ann"))
    );
}

// ==========================================
// 步骤切换与预览
// ==========================================

#[tokio::test]
async fn test_advance_requires_file() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    assert!(matches!(orch.advance(), Err(ImportError::NoWorkbook)));
}

#[tokio::test]
async fn test_preview_step_guards() {
    let orch = orchestrator_in_preview(ScriptedHandler::new(Script::Accept)).await;
    assert_eq!(orch.step().unwrap(), ImportStep::Preview);

    assert!(matches!(
        orch.edit_mapping("Mobile", None),
        Err(ImportError::InvalidStep { .. })
    ));
    assert!(matches!(
        orch.select_sheet("Other"),
        Err(ImportError::InvalidStep { .. })
    ));
    assert!(matches!(
        orch.advance(),
        Err(ImportError::InvalidStep { .. })
    ));
    assert!(matches!(
        orch.load_file("again.xlsx", vec![]).await,
        Err(ImportError::InvalidStep { .. })
    ));
}

#[tokio::test]
async fn test_upload_step_guards() {
    let orch = orchestrator_with(
        StaticLoader::new(contacts_workbook()),
        ScriptedHandler::new(Script::Accept),
    );
    orch.load_file("contacts.xlsx", vec![]).await.unwrap();

    assert!(matches!(orch.back(), Err(ImportError::InvalidStep { .. })));
    assert!(matches!(
        orch.preview_page(1, None),
        Err(ImportError::InvalidStep { .. })
    ));
    match orch.submit().await {
        Err(ImportError::InvalidStep { expected, actual }) => {
            assert_eq!(expected, "PREVIEW");
            assert_eq!(actual, "UPLOAD");
        }
        other => panic!("expected InvalidStep, got {:?}", other),
    }
}

#[tokio::test]
async fn test_back_keeps_mapping() {
    let orch = orchestrator_in_preview(ScriptedHandler::new(Script::Accept)).await;
    let mapping = orch.snapshot().unwrap().mapping;

    orch.back().unwrap();

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Upload);
    assert_eq!(snapshot.mapping, mapping);
    assert_eq!(snapshot.row_count(), 3);
    orch.edit_mapping("Mobile", None).unwrap();
}

#[tokio::test]
async fn test_preview_pagination() {
    let orch = orchestrator_in_preview(ScriptedHandler::new(Script::Accept))
        .await
        .with_preview_page_size(2);

    let first = orch.preview_page(1, None).unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.page_count(), 2);
    let serials: Vec<usize> = first.rows.iter().map(|r| r.serial).collect();
    assert_eq!(serials, vec![1, 2]);

    let second = orch.preview_page(2, None).unwrap();
    assert_eq!(second.rows.len(), 1);
    assert_eq!(second.rows[0].serial, 3);
    assert_eq!(second.rows[0].row.get("name"), Some(&CellValue::from("Ann")));

    let all = orch.preview_page(1, Some(10)).unwrap();
    assert_eq!(all.rows.len(), 3);

    let json = serde_json::to_value(&first).unwrap();
    assert_eq!(json["rows"][0]["serial"], 1);
    assert_eq!(json["rows"][0]["id"], 1);
    assert_eq!(json["rows"][0]["name"], "Bob");
}

// ==========================================
// 提交
// ==========================================

#[tokio::test]
async fn test_submit_success_resets_session() {
    let handler = ScriptedHandler::new(Script::Accept);
    let received = handler.received();
    let orch = orchestrator_in_preview(handler).await.with_preview_page_size(1);

    let result = orch.submit().await.unwrap();
    assert_eq!(
        result,
        SubmitResult::Submitted {
            row_count: 3,
            message: Some("ok".to_string()),
        }
    );

    // 提交的是全部投影行，而非当前页
    let batches = received.lock().unwrap().clone();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    assert_eq!(batches[0][2].id, 3);

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Upload);
    assert!(snapshot.file_name.is_none());
    assert!(snapshot.sheet_names.is_empty());
    assert!(snapshot.mapping.is_empty());
    assert!(snapshot.projection.is_empty());
    assert!(!snapshot.is_busy());
}

#[tokio::test]
async fn test_submit_rejected_stays_in_preview() {
    let orch = orchestrator_in_preview(ScriptedHandler::new(Script::Reject)).await;
    let before = orch.snapshot().unwrap().projection;

    match orch.submit().await {
        Err(ImportError::SubmitRejected(message)) => assert_eq!(message, "duplicate contacts"),
        other => panic!("expected SubmitRejected, got {:?}", other),
    }

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Preview);
    assert_eq!(snapshot.projection, before);
    assert_eq!(snapshot.last_error.as_deref(), Some("duplicate contacts"));
    assert!(!snapshot.is_busy());
}

#[tokio::test]
async fn test_submit_failure_stays_in_preview() {
    let orch = orchestrator_in_preview(ScriptedHandler::new(Script::Fail)).await;

    match orch.submit().await {
        Err(ImportError::SubmitFailed(message)) => assert!(message.contains("connection reset")),
        other => panic!("expected SubmitFailed, got {:?}", other),
    }

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Preview);
    assert!(snapshot.last_error.is_some());

    // 错误后可返回修改映射
    orch.back().unwrap();
    assert!(orch.snapshot().unwrap().last_error.is_none());
}

#[tokio::test]
async fn test_submit_nothing_to_import() {
    let schema = FieldSchema::new(vec![FieldSpec::optional("phone", "Phone")]).unwrap();
    let orch = ImportOrchestrator::new(
        schema,
        Box::new(StaticLoader::new(single_sheet_workbook(Vec::new()))),
        Box::new(ScriptedHandler::new(Script::Accept)),
    );

    orch.load_file("empty.csv", vec![]).await.unwrap();
    assert_eq!(
        orch.advance().unwrap(),
        AdvanceOutcome::Previewing { row_count: 0 }
    );

    assert!(matches!(
        orch.submit().await,
        Err(ImportError::NothingToImport)
    ));
    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Preview);
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn test_formatter_applied_before_submit() {
    let handler = ScriptedHandler::new(Script::Accept);
    let received = handler.received();
    let orch = orchestrator_in_preview(handler)
        .await
        .with_formatter(Box::new(UppercaseNameFormatter));

    orch.submit().await.unwrap();

    let batches = received.lock().unwrap().clone();
    let names: Vec<Option<&CellValue>> = batches[0].iter().map(|r| r.get("name")).collect();
    assert_eq!(
        names,
        vec![
            Some(&CellValue::from("BOB")),
            Some(&CellValue::from("SUE")),
            Some(&CellValue::from("ANN")),
        ]
    );
}

#[tokio::test]
async fn test_formatter_failure_stays_in_preview() {
    let handler = ScriptedHandler::new(Script::Accept);
    let received = handler.received();
    let orch = orchestrator_in_preview(handler)
        .await
        .with_formatter(Box::new(FailingFormatter));

    assert!(matches!(
        orch.submit().await,
        Err(ImportError::SubmitFailed(_))
    ));
    assert!(received.lock().unwrap().is_empty());
    assert_eq!(orch.step().unwrap(), ImportStep::Preview);
}

// ==========================================
// 在途互斥与取消
// ==========================================

#[tokio::test]
async fn test_busy_while_loading() {
    let gate = Gate::new();
    let orch = orchestrator_with(
        StaticLoader::gated(contacts_workbook(), gate.clone()),
        ScriptedHandler::new(Script::Accept),
    );

    let load = orch.load_file("contacts.xlsx", vec![]);
    let probe = async {
        gate.wait_started().await;

        assert!(orch.is_busy().unwrap());
        assert_eq!(orch.snapshot().unwrap().busy, Some(BusyOperation::LoadingFile));
        assert!(matches!(
            orch.load_file("other.xlsx", vec![]).await,
            Err(ImportError::Busy(op)) if op == "LOADING_FILE"
        ));
        assert!(matches!(orch.advance(), Err(ImportError::Busy(_))));
        assert!(matches!(
            orch.edit_mapping("Mobile", None),
            Err(ImportError::Busy(_))
        ));

        gate.open();
    };

    let (outcome, ()) = tokio::join!(load, probe);
    assert!(matches!(outcome.unwrap(), LoadOutcome::Loaded { row_count: 3, .. }));
    assert!(!orch.is_busy().unwrap());
    assert_eq!(
        orch.snapshot().unwrap().file_name.as_deref(),
        Some("contacts.xlsx")
    );
}

#[tokio::test]
async fn test_cancel_during_load_discards_result() {
    let gate = Gate::new();
    let orch = orchestrator_with(
        StaticLoader::gated(contacts_workbook(), gate.clone()),
        ScriptedHandler::new(Script::Accept),
    );

    let load = orch.load_file("contacts.xlsx", vec![]);
    let probe = async {
        gate.wait_started().await;
        orch.cancel().unwrap();

        let snapshot = orch.snapshot().unwrap();
        assert_eq!(snapshot.step, ImportStep::Upload);
        assert!(snapshot.file_name.is_none());
        // 在途标记保持到操作返回
        assert!(snapshot.is_busy());

        gate.open();
    };

    let (outcome, ()) = tokio::join!(load, probe);
    assert_eq!(outcome.unwrap(), LoadOutcome::Discarded);

    let snapshot = orch.snapshot().unwrap();
    assert!(!snapshot.is_busy());
    assert!(snapshot.file_name.is_none());
    assert!(snapshot.sheet_names.is_empty());
    assert!(snapshot.projection.is_empty());
}

#[tokio::test]
async fn test_busy_while_submitting() {
    let gate = Gate::new();
    let orch =
        orchestrator_in_preview(ScriptedHandler::new(Script::Accept).with_gate(gate.clone()))
            .await;

    let submit = orch.submit();
    let probe = async {
        gate.wait_started().await;

        assert_eq!(orch.snapshot().unwrap().busy, Some(BusyOperation::Submitting));
        assert!(matches!(
            orch.submit().await,
            Err(ImportError::Busy(op)) if op == "SUBMITTING"
        ));
        assert!(matches!(orch.back(), Err(ImportError::Busy(_))));

        gate.open();
    };

    let (result, ()) = tokio::join!(submit, probe);
    assert!(matches!(
        result.unwrap(),
        SubmitResult::Submitted { row_count: 3, .. }
    ));
    assert!(!orch.is_busy().unwrap());
}

#[tokio::test]
async fn test_cancel_during_submit_discards_result() {
    let gate = Gate::new();
    let handler = ScriptedHandler::new(Script::Reject).with_gate(gate.clone());
    let orch = orchestrator_in_preview(handler).await;

    let submit = orch.submit();
    let probe = async {
        gate.wait_started().await;
        orch.cancel().unwrap();
        assert_eq!(orch.step().unwrap(), ImportStep::Upload);
        gate.open();
    };

    let (result, ()) = tokio::join!(submit, probe);
    assert_eq!(result.unwrap(), SubmitResult::Discarded);

    // 被作废的拒绝结果不写入新会话
    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Upload);
    assert!(snapshot.last_error.is_none());
    assert!(!snapshot.is_busy());
}

#[tokio::test]
async fn test_cancel_when_idle_resets() {
    let orch = orchestrator_in_preview(ScriptedHandler::new(Script::Accept)).await;

    orch.cancel().unwrap();

    let snapshot = orch.snapshot().unwrap();
    assert_eq!(snapshot.step, ImportStep::Upload);
    assert!(snapshot.file_name.is_none());
    assert!(snapshot.mapping.is_empty());

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["step"], "UPLOAD");
    assert!(json["busy"].is_null());
}

#[tokio::test]
async fn test_dropped_load_releases_busy_slot() {
    let gate = Gate::new();
    let orch = orchestrator_with(
        StaticLoader::gated(contacts_workbook(), gate.clone()),
        ScriptedHandler::new(Script::Accept),
    );

    // 调用方超时丢弃在途 future
    let timed_out = timeout(
        Duration::from_millis(50),
        orch.load_file("contacts.xlsx", vec![]),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(!orch.is_busy().unwrap());

    orch.cancel().unwrap();
    assert!(!orch.is_busy().unwrap());

    // 预先放行，重新上传不再阻塞
    gate.open();
    let outcome = orch.load_file("contacts.xlsx", vec![]).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { row_count: 3, .. }));
    orch.edit_mapping("Mobile", None).unwrap();
}

#[tokio::test]
async fn test_dropped_submit_releases_busy_slot() {
    let gate = Gate::new();
    let handler = ScriptedHandler::new(Script::Accept).with_gate(gate.clone());
    let received = handler.received();
    let orch = orchestrator_in_preview(handler).await;

    let timed_out = timeout(Duration::from_millis(50), orch.submit()).await;
    assert!(timed_out.is_err());
    assert!(received.lock().unwrap().is_empty());

    let snapshot = orch.snapshot().unwrap();
    assert!(!snapshot.is_busy());
    assert_eq!(snapshot.step, ImportStep::Preview);

    gate.open();
    let result = orch.submit().await.unwrap();
    assert!(matches!(result, SubmitResult::Submitted { row_count: 3, .. }));
}
